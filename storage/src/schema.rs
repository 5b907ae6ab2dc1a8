//! Table definitions. Applied once, idempotently, on every open.

pub const MIGRATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS channels (
    channel_identifier TEXT NOT NULL PRIMARY KEY,
    token_address      TEXT NOT NULL,
    partner_address    TEXT NOT NULL,
    state_json         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS channels_by_partner ON channels (token_address, partner_address);

CREATE TABLE IF NOT EXISTS payment_snapshots (
    secret_hash  TEXT NOT NULL PRIMARY KEY,
    version      INTEGER NOT NULL,
    state_json   TEXT
);

CREATE TABLE IF NOT EXISTS pending_events (
    secret_hash  TEXT NOT NULL,
    version      INTEGER NOT NULL,
    seq          INTEGER NOT NULL,
    event_json   TEXT NOT NULL,
    PRIMARY KEY (secret_hash, version, seq)
);

CREATE TABLE IF NOT EXISTS chain_cursor (
    id           INTEGER NOT NULL PRIMARY KEY CHECK (id = 0),
    block_number INTEGER NOT NULL
);
"#;
