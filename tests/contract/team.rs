//! Members, projects, memberships and project settings.

use crate::test_helpers::project_id;
use mockable::DefaultClock;
use tracline::domain::{
    Member, MemberId, MemberPosition, MemberProfile, MemberRole, Project, ProjectMembership, ProjectSettings,
    ProjectStatus, StrictFlags,
};
use tracline::ports::{MemberFilter, PersistenceEngine, ProjectFilter};

fn member_id(value: &str) -> MemberId {
    MemberId::new(value).expect("valid member id")
}

fn member(engine: &mut dyn PersistenceEngine, id: &str, role: MemberRole, leader: Option<&str>) -> Member {
    let mut created = Member::new(member_id(id), format!("Member {id}"), role, &DefaultClock).expect("valid member");
    if let Some(leader_id) = leader {
        created = created.with_leader(member_id(leader_id));
    }
    engine.create_member(&created).expect("member should be stored");
    created
}

pub fn members_round_trip_and_filter(engine: &mut dyn PersistenceEngine) {
    member(engine, "lead", MemberRole::Tl, None);
    let profile = MemberProfile {
        age: Some(31),
        profile: Some("Storage engines".to_owned()),
        ..MemberProfile::default()
    };
    let mut engineer = member(engine, "eng", MemberRole::Engineer, Some("lead"));
    engineer.set_profile(profile.clone(), &DefaultClock);
    engineer.set_position(MemberPosition::Leader, &DefaultClock);
    assert!(engine.update_member(&engineer).expect("update member"));

    let reloaded = engine
        .get_member(&member_id("eng"))
        .expect("get member")
        .expect("member exists");
    assert_eq!(reloaded.profile(), &profile);
    assert_eq!(reloaded.position(), MemberPosition::Leader);
    assert_eq!(reloaded.leader_id().map(MemberId::as_str), Some("lead"));

    let reports = engine
        .list_members(&MemberFilter {
            leader_id: Some(member_id("lead")),
            ..MemberFilter::default()
        })
        .expect("list members");
    assert_eq!(reports.len(), 1);
    let leads = engine
        .list_members(&MemberFilter {
            role: Some(MemberRole::Tl),
            ..MemberFilter::default()
        })
        .expect("list members");
    assert_eq!(leads.first().map(|found| found.id().as_str()), Some("lead"));
}

pub fn removing_a_leader_orphans_reports_and_memberships(engine: &mut dyn PersistenceEngine) {
    member(engine, "lead", MemberRole::Tl, None);
    member(engine, "eng", MemberRole::Engineer, Some("lead"));
    let project = Project::new(project_id("web-app"), "Web app", &DefaultClock).expect("valid project");
    engine.create_project(&project).expect("create project");
    engine
        .add_project_member(&ProjectMembership {
            project_id: project_id("web-app"),
            member_id: member_id("lead"),
            joined_at: chrono::Utc::now(),
        })
        .expect("join project");

    assert!(engine.delete_member(&member_id("lead")).expect("delete member"));

    let orphan = engine
        .get_member(&member_id("eng"))
        .expect("get member")
        .expect("report survives");
    assert_eq!(orphan.leader_id(), None);
    assert!(engine
        .list_project_members(&project_id("web-app"))
        .expect("project members")
        .is_empty());
}

pub fn projects_memberships_and_filters(engine: &mut dyn PersistenceEngine) {
    member(engine, "owner", MemberRole::Owner, None);
    let web = Project::new(project_id("web-app"), "Web app", &DefaultClock)
        .expect("valid project")
        .with_owner(member_id("owner"))
        .with_description("Customer portal");
    let mut api = Project::new(project_id("api"), "API", &DefaultClock).expect("valid project");
    api.set_status(ProjectStatus::Archived, &DefaultClock);
    engine.create_project(&web).expect("create project");
    engine.create_project(&api).expect("create project");
    let duplicate = engine.create_project(&web).expect_err("duplicate project");
    assert!(duplicate.is_already_exists());

    for project in ["web-app", "api"] {
        engine
            .add_project_member(&ProjectMembership {
                project_id: project_id(project),
                member_id: member_id("owner"),
                joined_at: chrono::Utc::now(),
            })
            .expect("join project");
    }

    assert_eq!(engine.list_member_projects(&member_id("owner")).expect("projects").len(), 2);
    let archived = engine
        .list_projects(&ProjectFilter {
            status: Some(ProjectStatus::Archived),
            ..ProjectFilter::default()
        })
        .expect("list projects");
    assert_eq!(archived.first().map(|found| found.id().as_str()), Some("api"));
    let owned = engine
        .list_projects(&ProjectFilter {
            owner_id: Some(member_id("owner")),
            ..ProjectFilter::default()
        })
        .expect("list projects");
    assert_eq!(owned.len(), 1);

    assert!(engine
        .remove_project_member(&project_id("api"), &member_id("owner"))
        .expect("leave project"));
    assert!(engine.delete_project(&project_id("web-app")).expect("delete project"));
    assert!(engine.list_member_projects(&member_id("owner")).expect("projects").is_empty());
}

pub fn settings_are_upserted(engine: &mut dyn PersistenceEngine) {
    let id = project_id("web-app");
    assert!(engine.get_project_settings(&id).expect("settings").is_none());

    let mut settings = ProjectSettings::new(id.clone(), &DefaultClock);
    settings.project_root = Some("/srv/web-app".to_owned());
    settings.monitor_extensions = vec!["rs".to_owned(), "md".to_owned()];
    engine.save_project_settings(&settings).expect("insert settings");

    settings.strict = StrictFlags {
        doc_read: true,
        file_ref: false,
        log_entry: true,
    };
    settings.monitor_enabled = true;
    engine.save_project_settings(&settings).expect("update settings");

    let stored = engine
        .get_project_settings(&id)
        .expect("settings")
        .expect("settings exist");
    assert_eq!(stored.strict, settings.strict);
    assert!(stored.monitor_enabled);
    assert_eq!(stored.project_root.as_deref(), Some("/srv/web-app"));
    assert_eq!(stored.monitor_extensions, ["rs", "md"]);
    assert_eq!(stored.monitor_interval, ProjectSettings::DEFAULT_MONITOR_INTERVAL);
}
