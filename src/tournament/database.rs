//! SQLite store for users, tournaments and registrations.

use crate::tournament::model::{
    GameIdentity, Mode, NewTournament, Room, RosterEntry, Status, Tournament, User,
};
use crate::tournament::registration::{
    admit, status_after_join, status_after_leave, Registered, TournamentError,
};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

const SCHEMA: &str = r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS users (
        telegram_id INTEGER PRIMARY KEY,
        game_name TEXT,
        game_id TEXT,
        is_admin INTEGER NOT NULL DEFAULT 0,
        first_seen TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS tournaments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        mode TEXT NOT NULL,
        date_time TEXT NOT NULL,
        fee INTEGER NOT NULL CHECK (fee >= 0),
        capacity INTEGER NOT NULL CHECK (capacity >= 0),
        status TEXT NOT NULL DEFAULT 'OPEN',
        room_id TEXT,
        room_password TEXT,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS registrations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tournament_id INTEGER NOT NULL REFERENCES tournaments (id) ON DELETE CASCADE,
        telegram_id INTEGER NOT NULL REFERENCES users (telegram_id),
        registered_at TEXT NOT NULL,
        UNIQUE (tournament_id, telegram_id)
    );

    CREATE INDEX IF NOT EXISTS idx_users_game_id ON users(game_id);
    CREATE INDEX IF NOT EXISTS idx_tournaments_status ON tournaments(status);
    CREATE INDEX IF NOT EXISTS idx_registrations_user ON registrations(telegram_id);
"#;

const TOURNAMENT_COLUMNS: &str =
    "id, mode, date_time, fee, capacity, status, room_id, room_password, created_at";

fn now() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn tournament_from_row(row: &Row<'_>) -> rusqlite::Result<Tournament> {
    let room_id: Option<String> = row.get(6)?;
    let room_password: Option<String> = row.get(7)?;
    let room = match (room_id, room_password) {
        (Some(id), Some(password)) => Some(Room { id, password }),
        _ => None,
    };

    Ok(Tournament {
        id: row.get(0)?,
        mode: row.get::<_, Mode>(1)?,
        date_time: row.get(2)?,
        fee: row.get(3)?,
        capacity: row.get(4)?,
        status: row.get::<_, Status>(5)?,
        room,
        created_at: row.get(8)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        telegram_id: row.get(0)?,
        game_name: row.get(1)?,
        game_id: row.get(2)?,
        is_admin: row.get(3)?,
        first_seen: row.get(4)?,
    })
}

fn load_tournament(conn: &Connection, tournament_id: i64) -> rusqlite::Result<Option<Tournament>> {
    conn.query_row(
        &format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = ?1"),
        params![tournament_id],
        tournament_from_row,
    )
    .optional()
}

fn count_in(conn: &Connection, tournament_id: i64) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COUNT(*) FROM registrations WHERE tournament_id = ?1",
        params![tournament_id],
        |row| row.get(0),
    )
}

fn set_status(conn: &Connection, tournament_id: i64, status: Status) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE tournaments SET status = ?1 WHERE id = ?2",
        params![status, tournament_id],
    )?;
    Ok(())
}

/// Insert the registration and apply the capacity transition.
fn register_in(conn: &Connection, tournament_id: i64, telegram_id: i64) -> Result<Registered, TournamentError> {
    let tournament = load_tournament(conn, tournament_id)?.ok_or(TournamentError::TournamentNotFound)?;

    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM registrations WHERE tournament_id = ?1 AND telegram_id = ?2)",
        params![tournament_id, telegram_id],
        |row| row.get(0),
    )?;
    if exists {
        return Err(TournamentError::AlreadyRegistered);
    }

    admit(tournament.status)?;

    conn.execute(
        "INSERT INTO registrations (tournament_id, telegram_id, registered_at) VALUES (?1, ?2, ?3)",
        params![tournament_id, telegram_id, now()],
    )?;

    let count = count_in(conn, tournament_id)?;
    let filled = status_after_join(count, tournament.capacity) == Status::Full;
    if filled {
        set_status(conn, tournament_id, Status::Full)?;
        info!("🏁 Tournament {} is full ({}/{})", tournament_id, count, tournament.capacity);
    }

    Ok(Registered { count, capacity: tournament.capacity, filled })
}

/// Reopen a full tournament once a slot frees up.
fn reconcile_after_leave(conn: &Connection, tournament: &Tournament) -> rusqlite::Result<()> {
    let count = count_in(conn, tournament.id)?;
    let next = status_after_leave(tournament.status, count, tournament.capacity);
    if next != tournament.status {
        set_status(conn, tournament.id, next)?;
        info!("Tournament {} reopened ({}/{})", tournament.id, count, tournament.capacity);
    }
    Ok(())
}

/// Persistent SQLite database for the bot.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Create a new in-memory database.
    #[cfg(test)]
    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        let db = Self::with_connection(Connection::open(path)?)?;
        let (users, tournaments, registrations) = db.counts()?;
        info!(
            "Loaded database from {:?} ({} users, {} tournaments, {} registrations)",
            path, users, tournaments, registrations
        );
        Ok(db)
    }

    fn with_connection(conn: Connection) -> rusqlite::Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Row counts for users, tournaments and registrations.
    pub fn counts(&self) -> rusqlite::Result<(usize, usize, usize)> {
        let conn = self.conn();
        let count = |table: &str| -> rusqlite::Result<usize> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get::<_, i64>(0))
                .map(|n| n as usize)
        };
        Ok((count("users")?, count("tournaments")?, count("registrations")?))
    }

    // ==================== USER METHODS ====================

    /// Record a user on first contact. Existing rows are left untouched.
    pub fn ensure_user(&self, telegram_id: i64) -> rusqlite::Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO users (telegram_id, first_seen) VALUES (?1, ?2)",
            params![telegram_id, now()],
        )?;
        Ok(())
    }

    /// Store the player's in-game name and id.
    #[cfg(test)]
    pub fn save_identity(&self, telegram_id: i64, identity: &GameIdentity) -> rusqlite::Result<()> {
        save_identity_in(&self.conn(), telegram_id, identity)
    }

    pub fn get_user(&self, telegram_id: i64) -> rusqlite::Result<Option<User>> {
        self.conn()
            .query_row(
                "SELECT telegram_id, game_name, game_id, is_admin, first_seen FROM users WHERE telegram_id = ?1",
                params![telegram_id],
                user_from_row,
            )
            .optional()
    }

    pub fn all_user_ids(&self) -> rusqlite::Result<Vec<i64>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT telegram_id FROM users ORDER BY telegram_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    pub fn is_admin(&self, telegram_id: i64) -> rusqlite::Result<bool> {
        let flag: Option<bool> = self
            .conn()
            .query_row(
                "SELECT is_admin FROM users WHERE telegram_id = ?1",
                params![telegram_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(flag.unwrap_or(false))
    }

    /// Grant admin rights, creating the user row if needed.
    pub fn seed_admin(&self, telegram_id: i64) -> rusqlite::Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR IGNORE INTO users (telegram_id, first_seen) VALUES (?1, ?2)",
            params![telegram_id, now()],
        )?;
        conn.execute(
            "UPDATE users SET is_admin = 1 WHERE telegram_id = ?1",
            params![telegram_id],
        )?;
        debug!("Admin rights granted to {}", telegram_id);
        Ok(())
    }

    // ==================== TOURNAMENT METHODS ====================

    pub fn add_tournament(&self, new: &NewTournament) -> rusqlite::Result<Tournament> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO tournaments (mode, date_time, fee, capacity, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![new.mode, new.date_time, new.fee, new.capacity, Status::Open, now()],
        )?;
        let id = conn.last_insert_rowid();
        info!("🏆 Tournament {} created: {} on {} ({} slots, fee {})", id, new.mode, new.date_time, new.capacity, new.fee);
        load_tournament(&conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    pub fn get_tournament(&self, tournament_id: i64) -> rusqlite::Result<Option<Tournament>> {
        load_tournament(&self.conn(), tournament_id)
    }

    pub fn open_tournaments(&self) -> rusqlite::Result<Vec<Tournament>> {
        self.select_tournaments("WHERE status = 'OPEN' ORDER BY id", params![])
    }

    /// Every stored tournament, oldest first.
    pub fn tournaments(&self) -> rusqlite::Result<Vec<Tournament>> {
        self.select_tournaments("ORDER BY id", params![])
    }

    /// Tournaments the user is registered for.
    pub fn tournaments_for_user(&self, telegram_id: i64) -> rusqlite::Result<Vec<Tournament>> {
        self.select_tournaments(
            "WHERE id IN (SELECT tournament_id FROM registrations WHERE telegram_id = ?1) ORDER BY id",
            params![telegram_id],
        )
    }

    fn select_tournaments(&self, clause: &str, args: &[&dyn rusqlite::ToSql]) -> rusqlite::Result<Vec<Tournament>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments {clause}"))?;
        let tournaments = stmt
            .query_map(args, tournament_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tournaments)
    }

    pub fn count_registrations(&self, tournament_id: i64) -> rusqlite::Result<u32> {
        count_in(&self.conn(), tournament_id)
    }

    /// Registered players in sign-up order.
    pub fn registrations_for(&self, tournament_id: i64) -> rusqlite::Result<Vec<RosterEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT u.telegram_id, u.game_name, u.game_id, r.registered_at
             FROM registrations r
             JOIN users u ON r.telegram_id = u.telegram_id
             WHERE r.tournament_id = ?1
             ORDER BY r.id",
        )?;
        let roster = stmt
            .query_map(params![tournament_id], |row| {
                Ok(RosterEntry {
                    telegram_id: row.get(0)?,
                    game_name: row.get(1)?,
                    game_id: row.get(2)?,
                    registered_at: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(roster)
    }

    /// Set the match room credentials for later distribution.
    pub fn set_room(&self, tournament_id: i64, room: &Room) -> Result<(), TournamentError> {
        let updated = self.conn().execute(
            "UPDATE tournaments SET room_id = ?1, room_password = ?2 WHERE id = ?3",
            params![room.id, room.password, tournament_id],
        )?;
        if updated == 0 {
            return Err(TournamentError::TournamentNotFound);
        }
        info!("🔑 Room credentials set for tournament {}", tournament_id);
        Ok(())
    }

    // ==================== REGISTRATION METHODS ====================

    /// Register a user with an already stored identity.
    #[allow(dead_code)]
    pub fn attempt_register(&self, tournament_id: i64, telegram_id: i64) -> Result<Registered, TournamentError> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let registered = register_in(&tx, tournament_id, telegram_id)?;
        tx.commit()?;
        info!("✅ User {} registered for tournament {} ({}/{})", telegram_id, tournament_id, registered.count, registered.capacity);
        Ok(registered)
    }

    /// Store the identity and register in one transaction.
    ///
    /// The identity is kept even when the registration itself is refused,
    /// so `/myinfo` reflects what the player last entered.
    pub fn register_player(
        &self,
        tournament_id: i64,
        telegram_id: i64,
        identity: &GameIdentity,
    ) -> Result<Registered, TournamentError> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        save_identity_in(&tx, telegram_id, identity)?;
        match register_in(&tx, tournament_id, telegram_id) {
            Err(TournamentError::Storage(e)) => Err(TournamentError::Storage(e)),
            outcome => {
                tx.commit()?;
                if let Ok(registered) = &outcome {
                    info!("✅ User {} registered for tournament {} ({}/{})", telegram_id, tournament_id, registered.count, registered.capacity);
                }
                outcome
            }
        }
    }

    /// Cancel a registration. Returns whether one existed.
    pub fn unregister(&self, tournament_id: i64, telegram_id: i64) -> Result<bool, TournamentError> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(tournament) = load_tournament(&tx, tournament_id)? else {
            return Ok(false);
        };

        let removed = tx.execute(
            "DELETE FROM registrations WHERE tournament_id = ?1 AND telegram_id = ?2",
            params![tournament_id, telegram_id],
        )? > 0;
        if removed {
            reconcile_after_leave(&tx, &tournament)?;
        }
        tx.commit()?;

        if removed {
            info!("User {} left tournament {}", telegram_id, tournament_id);
        }
        Ok(removed)
    }

    /// Remove a player by external game id.
    pub fn kick(&self, tournament_id: i64, game_id: &str) -> Result<bool, TournamentError> {
        let game_id = game_id.trim();
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let tournament = load_tournament(&tx, tournament_id)?.ok_or(TournamentError::TournamentNotFound)?;

        let known: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE game_id = ?1)",
            params![game_id],
            |row| row.get(0),
        )?;
        if !known {
            return Err(TournamentError::PlayerNotFound);
        }

        let removed = tx.execute(
            "DELETE FROM registrations
             WHERE tournament_id = ?1
               AND telegram_id IN (SELECT telegram_id FROM users WHERE game_id = ?2)",
            params![tournament_id, game_id],
        )? > 0;
        if removed {
            reconcile_after_leave(&tx, &tournament)?;
        }
        tx.commit()?;

        if removed {
            info!("🚫 Player {} kicked from tournament {}", game_id, tournament_id);
        }
        Ok(removed)
    }

    /// Delete a tournament and its registrations. Returns whether it existed.
    pub fn delete_tournament(&self, tournament_id: i64) -> Result<bool, TournamentError> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM registrations WHERE tournament_id = ?1", params![tournament_id])?;
        let removed = tx.execute("DELETE FROM tournaments WHERE id = ?1", params![tournament_id])? > 0;
        tx.commit()?;

        if removed {
            info!("🗑️ Tournament {} deleted", tournament_id);
        }
        Ok(removed)
    }
}

fn save_identity_in(conn: &Connection, telegram_id: i64, identity: &GameIdentity) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO users (telegram_id, game_name, game_id, first_seen) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(telegram_id) DO UPDATE SET
            game_name = excluded.game_name,
            game_id = excluded.game_id",
        params![telegram_id, identity.game_name, identity.game_id, now()],
    )?;
    Ok(())
}
