//! plexup - Plex Media Server update orchestrator
//!
//! plexup keeps a locally installed Plex Media Server package current on a
//! Debian-based Linux host. A single run queries the remote release feed,
//! compares the advertised version against the version dpkg reports as
//! installed, and - only when they differ - downloads the matching `.deb`
//! artifact, verifies its SHA-1 checksum against the feed, and drives the
//! install sequence: back up `Preferences.xml`, stop the service, install the
//! package, start the service, and confirm systemd reports it `active`.
//!
//! # Architecture Overview
//!
//! The crate is organized around one orchestrator and a handful of leaf
//! collaborators:
//!
//! - [`config`] - YAML configuration provider (feed URL, platform tuple,
//!   package/service names, scratch directory)
//! - [`feed`] - release feed client: fetches and parses the remote metadata
//!   document and filters it down to candidates for the local platform
//! - [`probe`] - installed-version probe built on `dpkg -s` output parsing
//! - [`fetch`] - streaming artifact downloader and chunked SHA-1 hashing
//! - [`service`] - narrow systemd adapter (stop/start/status parsing)
//! - [`updater`] - the update orchestrator: version gate, download,
//!   verification, and the install state machine
//! - [`exec`] - subprocess seam shared by the probe, the service adapter,
//!   and the installer, so external tools can be faked in tests
//! - [`lock`] - advisory run lock preventing overlapping update runs
//! - [`cli`] - `check`, `update`, and `status` commands
//! - [`core`] - error taxonomy and user-facing error presentation
//!
//! # Design Notes
//!
//! Version comparison is an exact string-equality gate: any difference
//! between the installed version and the feed's latest version triggers an
//! update. No semantic ordering is attempted, so a feed rollback re-installs
//! the older package. The install sequence is best-effort: once a verified
//! artifact exists, every step runs in fixed order and individual step
//! failures are recorded and logged rather than short-circuiting, preferring
//! to leave the service running over halting mid-sequence.
//!
//! An unverified artifact never reaches the installer: a checksum mismatch
//! aborts the run and discards the download.
//!
//! # Configuration
//!
//! ```yaml
//! # /etc/plexup/config.yml
//! source: https://plex.tv/api/downloads/5.json
//! os: Linux
//! arch: x86_64
//! packaging: debian
//! ```
//!
//! # Command-Line Usage
//!
//! ```bash
//! # Report whether the feed advertises a different version
//! plexup check
//!
//! # Perform the full update run
//! plexup update
//!
//! # Show the installed version and current service health
//! plexup status
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod exec;
pub mod feed;
pub mod fetch;
pub mod lock;
pub mod probe;
pub mod service;
pub mod updater;
