//! Passcode generation

use rand::Rng;

/// Codes reserved as deterministic test sentinels; never issued
pub const RESERVED_CODES: [&str; 2] = ["123456", "999999"];

/// Generate a random 6-digit passcode, re-rolling reserved sentinels
pub fn generate_code() -> String {
    loop {
        let code: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
        let code = code.to_string();
        if !RESERVED_CODES.contains(&code.as_str()) {
            return code;
        }
    }
}

/// Whether a submitted code is exactly six ASCII digits
pub fn is_valid_shape(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}
