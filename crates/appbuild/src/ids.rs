use rand::Rng;

/// Length of a generated local build identifier.
pub const LOCAL_ID_LEN: usize = 12;

// URL-safe, 64 symbols: 6 bits of randomness per character.
const ALPHABET: &[u8; 64] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz_-";

/// Generate the opaque identifier handed to clients for polling.
///
/// Independent of the provider's job id so the provider can be swapped
/// without changing client-facing links.
pub fn new_local_id() -> String {
    let mut rng = rand::thread_rng();
    (0..LOCAL_ID_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
