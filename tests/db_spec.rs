use okr_tracker::db::{Database, MissingCollection};
use okr_tracker::models::*;
use okr_tracker::services::{
    AreaService, ObjectiveService, ProjectService, ServiceError, SqliteServices, TimeFrameService,
};
use speculate2::speculate;
use uuid::Uuid;

fn create_test_area(db: &Database, name: &str, order: i64) -> Area {
    db.create_area(CreateAreaInput {
        name: name.to_string(),
        description: None,
        order,
    })
    .expect("Failed to create area")
}

fn create_test_objective(db: &Database, time_frame_id: Uuid, area_id: Uuid, name: &str) -> Objective {
    db.create_objective(
        time_frame_id,
        CreateObjectiveInput {
            name: name.to_string(),
            area_id,
            key_results: vec![KeyResult::new("First"), KeyResult::new("Second")],
            comments: vec![],
            order: 10,
        },
    )
    .expect("Failed to create objective")
}

fn is_missing_collection(err: &anyhow::Error) -> bool {
    err.downcast_ref::<MissingCollection>().is_some()
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "collections" {
        it "reports collections that were never written as missing" {
            let err = db.get_areas().unwrap_err();
            assert!(is_missing_collection(&err));
            assert!(is_missing_collection(&db.get_time_frames().unwrap_err()));
            assert!(is_missing_collection(&db.get_objectives(Uuid::new_v4()).unwrap_err()));
        }

        it "registers a collection on first create" {
            assert!(!db.collection_exists("areas").unwrap());
            create_test_area(&db, "Sales", 0);
            assert!(db.collection_exists("areas").unwrap());
        }

        it "keeps the collection after its last entity is deleted" {
            let area = create_test_area(&db, "Sales", 0);
            db.delete_areas(&[area.id]).unwrap();

            assert!(db.get_areas().unwrap().is_empty());
        }
    }

    describe "areas" {
        it "lists areas by order" {
            create_test_area(&db, "Late", 2);
            create_test_area(&db, "Early", 0);

            let names: Vec<String> = db.get_areas().unwrap().into_iter().map(|a| a.name).collect();
            assert_eq!(names, vec!["Early", "Late"]);
        }

        it "saves every field" {
            let area = create_test_area(&db, "Sales", 0);
            let edited = UpdateAreaInput {
                description: Some(Some("Revenue".to_string())),
                order: Some(4),
                ..Default::default()
            }
            .apply(&area);

            let saved = db.save_area(&edited).unwrap().expect("area exists");
            assert_eq!(saved.description.as_deref(), Some("Revenue"));

            let stored = db.get_area(area.id).unwrap().unwrap();
            assert_eq!(stored.name, "Sales");
            assert_eq!(stored.order, 4);
        }

        it "returns nothing when saving an unknown area" {
            create_test_area(&db, "Sales", 0);
            let mut ghost = create_test_area(&db, "Ghost", 1);
            db.delete_areas(&[ghost.id]).unwrap();
            ghost.name = "Still gone".to_string();

            assert!(db.save_area(&ghost).unwrap().is_none());
        }

        it "deletes only the given ids" {
            let sales = create_test_area(&db, "Sales", 0);
            let support = create_test_area(&db, "Support", 1);

            assert_eq!(db.delete_areas(&[sales.id]).unwrap(), 1);
            assert_eq!(db.get_areas().unwrap(), vec![support]);
        }
    }

    describe "time frames" {
        it "uses a caller-chosen id" {
            let input = CreateTimeFrameInput::bootstrap();
            let id = input.id;
            let created = db.create_time_frame(input).unwrap();

            assert_eq!(Some(created.id), id);
            assert!(created.is_current);
            assert_eq!(created.name, BOOTSTRAP_TIME_FRAME_NAME);
        }

        it "persists the current flag" {
            let created = db.create_time_frame(CreateTimeFrameInput::bootstrap()).unwrap();
            let demoted = UpdateTimeFrameInput { is_current: Some(false), ..Default::default() }
                .apply(&created);
            db.save_time_frame(&demoted).unwrap();

            let stored = db.get_time_frames().unwrap();
            assert_eq!(stored.len(), 1);
            assert!(!stored[0].is_current);
        }
    }

    describe "objectives" {
        it "scopes objectives by time frame" {
            let area = create_test_area(&db, "Sales", 0);
            let q1 = Uuid::new_v4();
            let q2 = Uuid::new_v4();
            let grow = create_test_objective(&db, q1, area.id, "Grow");

            assert_eq!(db.get_objectives(q1).unwrap(), vec![grow]);
            assert!(is_missing_collection(&db.get_objectives(q2).unwrap_err()));
        }

        it "round-trips key results and comments" {
            let area = create_test_area(&db, "Sales", 0);
            let q1 = Uuid::new_v4();
            let mut grow = create_test_objective(&db, q1, area.id, "Grow");
            grow.key_results[1].status = KeyResultStatus::AtRisk;
            grow.key_results[1].comment = "Behind plan".to_string();
            grow.comments.push("Reviewed".to_string());

            db.save_objective(q1, &grow).unwrap().expect("objective exists");

            let stored = db.get_objectives(q1).unwrap().remove(0);
            assert_eq!(stored.key_results, grow.key_results);
            assert_eq!(stored.comments, vec!["Reviewed".to_string()]);
        }

        it "does not save into another time frame" {
            let area = create_test_area(&db, "Sales", 0);
            let q1 = Uuid::new_v4();
            let grow = create_test_objective(&db, q1, area.id, "Grow");

            assert!(db.save_objective(Uuid::new_v4(), &grow).unwrap().is_none());
        }

        it "deletes by id within a time frame" {
            let area = create_test_area(&db, "Sales", 0);
            let q1 = Uuid::new_v4();
            let grow = create_test_objective(&db, q1, area.id, "Grow");
            let keep = create_test_objective(&db, q1, area.id, "Keep");

            db.delete_objectives(q1, &[grow.id]).unwrap();
            assert_eq!(db.get_objectives(q1).unwrap(), vec![keep]);
        }
    }

    describe "project name" {
        it "is absent until set" {
            assert_eq!(db.get_project_name().unwrap(), None);
        }

        it "keeps the latest value" {
            db.set_project_name("First").unwrap();
            db.set_project_name("Acme").unwrap();
            assert_eq!(db.get_project_name().unwrap().as_deref(), Some("Acme"));
        }
    }

    describe "sqlite services" {
        before {
            let services = SqliteServices::new(db.clone());
        }

        it "maps missing collections to CollectionNotFound" {
            let err = tokio_test::block_on(AreaService::get_all(&services)).unwrap_err();
            assert!(err.is_collection_not_found());

            let err = tokio_test::block_on(TimeFrameService::get_all(&services)).unwrap_err();
            assert!(err.is_collection_not_found());

            let err = tokio_test::block_on(ProjectService::project_name(&services)).unwrap_err();
            assert!(err.is_collection_not_found());
        }

        it "deletes what the predicate matches" {
            let area = create_test_area(&db, "Sales", 0);
            let other = create_test_area(&db, "Other", 1);
            let q1 = Uuid::new_v4();
            create_test_objective(&db, q1, area.id, "Grow");
            let keep = create_test_objective(&db, q1, other.id, "Keep");

            let area_id = area.id;
            tokio_test::block_on(ObjectiveService::delete(
                &services,
                q1,
                Box::new(move |o: &Objective| o.area_id == area_id),
            ))
            .unwrap();

            assert_eq!(db.get_objectives(q1).unwrap(), vec![keep]);
        }

        it "reports saving an unknown entity as not found" {
            let area = create_test_area(&db, "Sales", 0);
            db.delete_areas(&[area.id]).unwrap();

            let err = tokio_test::block_on(AreaService::save(&services, area.clone())).unwrap_err();
            assert_eq!(err, ServiceError::not_found("Area", area.id));
        }
    }
}
