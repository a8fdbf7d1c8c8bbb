use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the migration text
pub fn compute_checksum(sql: &str) -> String {
    let digest = Sha256::new().chain_update(sql).finalize();
    hex::encode(digest)
}
