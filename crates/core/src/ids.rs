//! Room codes and host secrets

use rand::Rng;

/// Characters a room code is drawn from
const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of a room code
pub const ROOM_CODE_LEN: usize = 4;

/// Random bytes behind a host secret (hex-encoded to twice this length)
const HOST_SECRET_BYTES: usize = 10;

/// Generate a 4-letter room code. Not unique by itself; the registry retries on collision.
pub fn generate_room_code() -> String {
    let mut rng = rand::thread_rng();
    (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Generate a host secret: 20 uppercase hex characters
pub fn generate_host_secret() -> String {
    let mut bytes = [0u8; HOST_SECRET_BYTES];
    rand::thread_rng().fill(&mut bytes);
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

/// Check that a string looks like a room code
pub fn is_valid_room_code(code: &str) -> bool {
    code.len() == ROOM_CODE_LEN && code.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b))
}

/// Normalize user-entered codes ("abcd " -> "ABCD")
pub fn normalize_room_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
