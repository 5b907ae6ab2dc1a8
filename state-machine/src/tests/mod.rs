//! Test-only scaffolding. `factories` builds channels, routes and locks;
//! everything else mirrors the `machine` module it tests one file at a time,
//! plus a `scenarios` module that replays full 3-node payments the way they
//! actually occur on the wire.

mod factories;
mod initiator;
mod scenarios;
mod target;
