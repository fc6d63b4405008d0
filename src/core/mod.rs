// ─── Packsync Core ───
// Keeps a Minecraft instance's mods in line with a published manifest.
//
// Architecture:
//   core/
//     sync_info/  - Manifest model + loading from URL or file
//     environment - Client/server inclusion rules
//     integrity/  - Streaming hashes + digest verification
//     instance/   - Instance directory layout
//     options/    - options.txt store + resource pack values
//     downloader/ - Downloader trait + streaming HTTP implementation
//     sync/       - Reconciliation engine, plan and report
//     updater/    - Self update check, download and swap
//     launcher    - Launcher integration contract
//     config      - Per-instance config + run context

pub mod config;
pub mod downloader;
pub mod environment;
pub mod error;
pub mod http;
pub mod instance;
pub mod integrity;
pub mod launcher;
pub mod options;
pub mod sync;
pub mod sync_info;
pub mod updater;
