//! Row encoding for the engine's single fixed schema:
//! `(id: u32, username: text<=32, email: text<=255)`.

/// Maximum printable length of `username`, not counting the terminator.
pub const USERNAME_MAX_LEN: usize = 32;
/// Maximum printable length of `email`, not counting the terminator.
pub const EMAIL_MAX_LEN: usize = 255;

const ID_SIZE: usize = 4;
const USERNAME_SIZE: usize = USERNAME_MAX_LEN + 1;
const EMAIL_SIZE: usize = EMAIL_MAX_LEN + 1;

const ID_OFFSET: usize = 0;
const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_SIZE;

/// Total on-disk size of one row, per spec.md §3.
pub const ROW_SIZE: usize = EMAIL_OFFSET + EMAIL_SIZE;

/// A single row of the fixed `(id, username, email)` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub username: String,
    pub email: String,
}

impl Row {
    pub fn new(id: u32, username: impl Into<String>, email: impl Into<String>) -> Row {
        Row {
            id,
            username: username.into(),
            email: email.into(),
        }
    }
}

/// Copies `row` into a fixed 291-byte slice at its defined offsets.
///
/// Trailing bytes of each text field are zero-padded; callers never see
/// partially-written cells because the whole slice is allocated up front.
pub fn encode(row: &Row) -> [u8; ROW_SIZE] {
    let mut buf = [0u8; ROW_SIZE];
    buf[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&row.id.to_le_bytes());
    write_fixed_str(
        &mut buf[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE],
        &row.username,
    );
    write_fixed_str(
        &mut buf[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE],
        &row.email,
    );
    buf
}

/// Inverse of [`encode`]. Strings terminate at the first zero byte.
pub fn decode(bytes: &[u8]) -> Row {
    debug_assert_eq!(bytes.len(), ROW_SIZE);

    let id = u32::from_le_bytes(
        bytes[ID_OFFSET..ID_OFFSET + ID_SIZE]
            .try_into()
            .expect("id field is exactly 4 bytes"),
    );
    let username = read_fixed_str(&bytes[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE]);
    let email = read_fixed_str(&bytes[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE]);

    Row {
        id,
        username,
        email,
    }
}

fn write_fixed_str(dest: &mut [u8], s: &str) {
    let bytes = s.as_bytes();
    dest[..bytes.len()].copy_from_slice(bytes);
    dest[bytes.len()..].fill(0);
}

fn read_fixed_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_row() {
        let row = Row::new(42, "alice", "alice@example.com");
        let encoded = encode(&row);
        assert_eq!(decode(&encoded), row);
    }

    #[test]
    fn pads_short_fields_with_zeros() {
        let row = Row::new(1, "a", "b");
        let encoded = encode(&row);
        assert_eq!(encoded[USERNAME_OFFSET + 1], 0);
        assert_eq!(encoded[USERNAME_OFFSET + USERNAME_SIZE - 1], 0);
    }

    #[test]
    fn accepts_exactly_max_length_fields() {
        let username = "u".repeat(USERNAME_MAX_LEN);
        let email = "e".repeat(EMAIL_MAX_LEN);
        let row = Row::new(1, username.clone(), email.clone());
        let decoded = decode(&encode(&row));
        assert_eq!(decoded.username, username);
        assert_eq!(decoded.email, email);
    }

    #[test]
    fn row_size_and_offsets_match_spec() {
        // id(4) + username(33) + email(256), offsets 0 / 4 / 37 (see DESIGN.md
        // for why this wins over spec.md's inconsistent "291-byte" prose).
        assert_eq!(ROW_SIZE, 293);
        assert_eq!(USERNAME_OFFSET, 4);
        assert_eq!(EMAIL_OFFSET, 37);
    }
}
