//! Secret vault backends
//!
//! Three backends implement [`SecretVault`]:
//! 1. OS Keychain (hardware-backed where available)
//! 2. Encrypted file (fallback, password protected)
//! 3. In-memory (tests and ephemeral clients)

mod encrypted_file;
mod keychain;
mod memory;
mod traits;

pub use encrypted_file::EncryptedFileVault;
pub use keychain::KeychainVault;
pub use memory::MemoryVault;
pub use traits::SecretVault;
