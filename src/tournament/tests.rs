//! Registration lifecycle scenarios against an in-memory database.

use super::model::Status;
use super::*;
use std::sync::Arc;

fn db() -> Database {
    Database::open_in_memory().unwrap()
}

fn player(n: i64) -> GameIdentity {
    GameIdentity {
        game_name: format!("Player{n}"),
        game_id: format!("9000{n}"),
    }
}

fn clash_squad(db: &Database) -> Tournament {
    db.add_tournament(&NewTournament::with_default_capacity(Mode::ClashSquad, "May 25, 8:00 PM", 50))
        .unwrap()
}

fn with_capacity(db: &Database, capacity: u32) -> Tournament {
    db.add_tournament(&NewTournament {
        mode: Mode::BattleRoyale,
        date_time: "Sunday".to_string(),
        fee: 0,
        capacity,
    })
    .unwrap()
}

fn status_of(db: &Database, id: i64) -> Status {
    db.get_tournament(id).unwrap().unwrap().status
}

// =============================================================================
// REGISTER
// =============================================================================

mod register {
    use super::*;

    #[test]
    fn test_first_registration_succeeds() {
        let db = db();
        let t = clash_squad(&db);

        let registered = db.register_player(t.id, 1, &player(1)).unwrap();
        assert_eq!(registered, Registered { count: 1, capacity: 8, filled: false });
        assert_eq!(status_of(&db, t.id), Status::Open);
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let db = db();
        let t = clash_squad(&db);

        db.register_player(t.id, 1, &player(1)).unwrap();
        let second = db.register_player(t.id, 1, &player(1));

        assert!(matches!(second, Err(TournamentError::AlreadyRegistered)));
        assert_eq!(db.count_registrations(t.id).unwrap(), 1);
        assert_eq!(status_of(&db, t.id), Status::Open);
    }

    #[test]
    fn test_attempt_register_uses_stored_identity() {
        let db = db();
        let t = clash_squad(&db);
        db.save_identity(5, &player(5)).unwrap();

        db.attempt_register(t.id, 5).unwrap();
        let roster = db.registrations_for(t.id).unwrap();
        assert_eq!(roster[0].game_id.as_deref(), Some("90005"));
    }

    #[test]
    fn test_identity_kept_when_registration_refused() {
        let db = db();
        let t = clash_squad(&db);
        db.register_player(t.id, 1, &player(1)).unwrap();

        let renamed = GameIdentity { game_name: "Renamed".to_string(), game_id: "1".to_string() };
        assert!(db.register_player(t.id, 1, &renamed).is_err());
        assert_eq!(db.get_user(1).unwrap().unwrap().game_name.as_deref(), Some("Renamed"));
    }

    #[test]
    fn test_unknown_tournament() {
        let db = db();
        db.ensure_user(1).unwrap();
        assert!(matches!(db.attempt_register(404, 1), Err(TournamentError::TournamentNotFound)));
    }

    #[test]
    fn test_clash_squad_fills_at_eight() {
        let db = db();
        let t = clash_squad(&db);

        for n in 1..=7 {
            let registered = db.register_player(t.id, n, &player(n)).unwrap();
            assert!(!registered.filled);
        }
        let eighth = db.register_player(t.id, 8, &player(8)).unwrap();
        assert!(eighth.filled);
        assert_eq!(eighth.count, 8);
        assert_eq!(status_of(&db, t.id), Status::Full);

        let ninth = db.register_player(t.id, 9, &player(9));
        assert!(matches!(ninth, Err(TournamentError::TournamentNotOpen)));
        assert_eq!(db.count_registrations(t.id).unwrap(), 8);
        assert!(db.open_tournaments().unwrap().is_empty());
    }

    #[test]
    fn test_already_registered_wins_over_full() {
        let db = db();
        let t = with_capacity(&db, 1);
        db.register_player(t.id, 1, &player(1)).unwrap();

        assert!(matches!(db.attempt_register(t.id, 1), Err(TournamentError::AlreadyRegistered)));
    }

    #[test]
    fn test_zero_capacity_fills_on_first_registration() {
        let db = db();
        let t = with_capacity(&db, 0);

        let first = db.register_player(t.id, 1, &player(1)).unwrap();
        assert!(first.filled);
        assert_eq!(status_of(&db, t.id), Status::Full);
        assert!(matches!(
            db.register_player(t.id, 2, &player(2)),
            Err(TournamentError::TournamentNotOpen)
        ));
    }

    #[test]
    fn test_concurrent_registrations_never_oversubscribe() {
        let db = Arc::new(db());
        let id = clash_squad(&db).id;

        let handles: Vec<_> = (1..=24)
            .map(|n| {
                let db = db.clone();
                std::thread::spawn(move || db.register_player(id, n, &player(n)))
            })
            .collect();

        let mut filled = 0;
        let mut refused = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(registered) if registered.filled => filled += 1,
                Ok(_) => {}
                Err(TournamentError::TournamentNotOpen) => refused += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(db.count_registrations(id).unwrap(), 8);
        assert_eq!(filled, 1);
        assert_eq!(refused, 16);
        assert_eq!(status_of(&db, id), Status::Full);
    }
}

// =============================================================================
// UNREGISTER
// =============================================================================

mod unregister {
    use super::*;

    #[test]
    fn test_unregister_removes_registration() {
        let db = db();
        let t = clash_squad(&db);
        db.register_player(t.id, 1, &player(1)).unwrap();

        assert!(db.unregister(t.id, 1).unwrap());
        assert_eq!(db.count_registrations(t.id).unwrap(), 0);
        assert!(db.tournaments_for_user(1).unwrap().is_empty());
    }

    #[test]
    fn test_unregister_absent_is_noop() {
        let db = db();
        let t = clash_squad(&db);
        db.register_player(t.id, 1, &player(1)).unwrap();

        assert!(!db.unregister(t.id, 2).unwrap());
        assert!(!db.unregister(404, 1).unwrap());
        assert_eq!(db.count_registrations(t.id).unwrap(), 1);
    }

    #[test]
    fn test_unregister_reopens_full_tournament() {
        let db = db();
        let t = with_capacity(&db, 2);
        db.register_player(t.id, 1, &player(1)).unwrap();
        db.register_player(t.id, 2, &player(2)).unwrap();
        assert_eq!(status_of(&db, t.id), Status::Full);

        db.unregister(t.id, 1).unwrap();
        assert_eq!(status_of(&db, t.id), Status::Open);

        // The freed slot can be taken again, which fills it once more
        let again = db.register_player(t.id, 3, &player(3)).unwrap();
        assert!(again.filled);
        assert_eq!(status_of(&db, t.id), Status::Full);
    }
}

// =============================================================================
// KICK
// =============================================================================

mod kick {
    use super::*;

    #[test]
    fn test_kick_by_game_id() {
        let db = db();
        let t = clash_squad(&db);
        db.register_player(t.id, 1, &player(1)).unwrap();
        db.register_player(t.id, 2, &player(2)).unwrap();

        assert!(db.kick(t.id, " 90001 ").unwrap());
        let remaining: Vec<_> = db.registrations_for(t.id).unwrap().into_iter().map(|r| r.telegram_id).collect();
        assert_eq!(remaining, vec![2]);
    }

    #[test]
    fn test_kick_unknown_player() {
        let db = db();
        let t = clash_squad(&db);
        db.register_player(t.id, 1, &player(1)).unwrap();

        assert!(matches!(db.kick(t.id, "does-not-exist"), Err(TournamentError::PlayerNotFound)));
        assert_eq!(db.count_registrations(t.id).unwrap(), 1);
    }

    #[test]
    fn test_kick_known_player_not_registered() {
        let db = db();
        let t = clash_squad(&db);
        let other = clash_squad(&db);
        db.register_player(other.id, 1, &player(1)).unwrap();

        assert!(!db.kick(t.id, "90001").unwrap());
        assert_eq!(db.count_registrations(other.id).unwrap(), 1);
    }

    #[test]
    fn test_kick_unknown_tournament() {
        let db = db();
        db.save_identity(1, &player(1)).unwrap();
        assert!(matches!(db.kick(404, "90001"), Err(TournamentError::TournamentNotFound)));
    }

    #[test]
    fn test_kick_reopens_full_tournament() {
        let db = db();
        let t = with_capacity(&db, 1);
        db.register_player(t.id, 1, &player(1)).unwrap();
        assert_eq!(status_of(&db, t.id), Status::Full);

        db.kick(t.id, "90001").unwrap();
        assert_eq!(status_of(&db, t.id), Status::Open);
    }
}

// =============================================================================
// DELETE
// =============================================================================

mod delete {
    use super::*;

    #[test]
    fn test_delete_cascades_registrations() {
        let db = db();
        let t = clash_squad(&db);
        let kept = clash_squad(&db);
        for n in 1..=3 {
            db.register_player(t.id, n, &player(n)).unwrap();
        }
        db.register_player(kept.id, 1, &player(1)).unwrap();

        assert!(db.delete_tournament(t.id).unwrap());
        assert_eq!(db.count_registrations(t.id).unwrap(), 0);
        assert_eq!(db.get_tournament(t.id).unwrap(), None);
        assert_eq!(db.count_registrations(kept.id).unwrap(), 1);
        // Users are never deleted
        assert_eq!(db.all_user_ids().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let db = db();
        let t = clash_squad(&db);

        assert!(db.delete_tournament(t.id).unwrap());
        assert!(!db.delete_tournament(t.id).unwrap());
        assert!(!db.delete_tournament(404).unwrap());
    }

    #[test]
    fn test_register_into_deleted_tournament() {
        let db = db();
        let t = clash_squad(&db);
        db.delete_tournament(t.id).unwrap();

        assert!(matches!(
            db.register_player(t.id, 1, &player(1)),
            Err(TournamentError::TournamentNotFound)
        ));
    }
}
