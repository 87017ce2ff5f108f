//! Leader relation between members and cycle detection over it.

use super::{Member, MemberId};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// Directed "reports to" edges between members.
///
/// Each member has at most one outgoing edge, towards its leader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderGraph {
    leaders: BTreeMap<MemberId, Option<MemberId>>,
}

impl LeaderGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph from stored members.
    #[must_use]
    pub fn from_members<'a>(members: impl IntoIterator<Item = &'a Member>) -> Self {
        let leaders = members
            .into_iter()
            .map(|member| (member.id().clone(), member.leader_id().cloned()))
            .collect();
        Self { leaders }
    }

    /// Inserts or replaces the leader edge of `member`.
    pub fn set_leader(&mut self, member: MemberId, leader: Option<MemberId>) {
        if let Some(leader_id) = &leader {
            self.leaders.entry(leader_id.clone()).or_insert(None);
        }
        self.leaders.insert(member, leader);
    }

    /// Returns `true` when pointing `member` at `leader` would close a cycle.
    #[must_use]
    pub fn would_create_cycle(&self, member: &MemberId, leader: &MemberId) -> bool {
        let mut candidate = self.clone();
        candidate.set_leader(member.clone(), Some(leader.clone()));
        let mut marks = HashMap::new();
        candidate
            .walk(member, &mut marks)
            .is_some_and(|cycle| cycle.contains(member))
    }

    /// Returns the members forming a cycle, if the graph contains one.
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<MemberId>> {
        let mut marks = HashMap::new();
        self.leaders
            .keys()
            .find_map(|start| self.walk(start, &mut marks))
    }

    /// Depth-first walk along leader edges from `start`.
    ///
    /// Members on the current path are marked in progress; reaching one of
    /// them again means the path looped, and the loop is returned.
    fn walk<'a>(
        &'a self,
        start: &'a MemberId,
        marks: &mut HashMap<&'a MemberId, Visit>,
    ) -> Option<Vec<MemberId>> {
        let mut path: Vec<&MemberId> = Vec::new();
        let mut cursor = Some(start);
        let mut cycle = None;
        while let Some(current) = cursor {
            match marks.get(current) {
                Some(Visit::Done) => break,
                Some(Visit::InProgress) => {
                    cycle = path
                        .iter()
                        .position(|member| *member == current)
                        .map(|position| {
                            path.iter()
                                .skip(position)
                                .map(|member| (*member).clone())
                                .collect()
                        });
                    break;
                }
                None => {
                    marks.insert(current, Visit::InProgress);
                    path.push(current);
                    cursor = self.leaders.get(current).and_then(Option::as_ref);
                }
            }
        }
        for member in path {
            marks.insert(member, Visit::Done);
        }
        cycle
    }

    /// Returns the members whose leader is `leader`, in identifier order.
    #[must_use]
    pub fn direct_reports(&self, leader: &MemberId) -> Vec<MemberId> {
        self.leaders
            .iter()
            .filter(|(_, member_leader)| member_leader.as_ref() == Some(leader))
            .map(|(member, _)| member.clone())
            .collect()
    }
}

/// A member with their direct reports, recursively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamNode {
    /// The member at this node.
    pub member: Member,
    /// Direct reports of the member.
    pub reports: Vec<TeamNode>,
}

impl TeamNode {
    /// Returns the number of members in this subtree, including the root.
    #[must_use]
    pub fn size(&self) -> usize {
        1 + self.reports.iter().map(Self::size).sum::<usize>()
    }
}
