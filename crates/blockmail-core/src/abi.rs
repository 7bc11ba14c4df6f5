//! Minimal Solidity ABI codec for the mail contract surface.
//!
//! Only the types the contract uses are supported: `address`, `uint256`
//! (values that fit in a `u64`), `bool`, `string`, dynamic arrays and tuples.

use sha3::{Digest, Keccak256};

use crate::models::{Address, Message, Profile};

const WORD: usize = 32;

pub const SEND_EMAIL: &str = "sendEmail(address,string,string)";
pub const GET_SENT_EMAILS: &str = "getSentEmails()";
pub const GET_RECEIVED_EMAILS: &str = "getReceivedEmails()";
pub const GET_STARRED_EMAILS: &str = "getStarredEmails()";
pub const STAR_EMAIL: &str = "starEmail(uint256,bool)";
pub const UNSTAR_EMAIL: &str = "unstarEmail(uint256,bool)";
pub const DELETE_EMAIL: &str = "deleteEmail(uint256,bool)";
pub const UPDATE_PROFILE: &str = "updateProfile(string,string)";
pub const GET_PROFILE: &str = "getProfile(address)";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    #[error("data truncated: need a word at offset {0}")]
    OutOfBounds(usize),
    #[error("value at offset {0} does not fit in 64 bits")]
    Overflow(usize),
    #[error("invalid bool encoding at offset {0}")]
    InvalidBool(usize),
    #[error("string at offset {0} is not valid UTF-8")]
    InvalidUtf8(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Uint(u64),
    Bool(bool),
    String(String),
    Array(Vec<Token>),
    Tuple(Vec<Token>),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        match self {
            Token::String(_) | Token::Array(_) => true,
            Token::Tuple(items) => items.iter().any(Token::is_dynamic),
            _ => false,
        }
    }
}

/// First four bytes of the Keccak-256 hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Calldata for `signature` applied to `args`.
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut data = selector(signature).to_vec();
    data.extend(encode(args));
    data
}

/// Head/tail encoding of a parameter list.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let encoded: Vec<Vec<u8>> = tokens.iter().map(encode_token).collect();
    let head_len: usize = tokens
        .iter()
        .zip(&encoded)
        .map(|(token, bytes)| if token.is_dynamic() { WORD } else { bytes.len() })
        .sum();

    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();
    for (token, bytes) in tokens.iter().zip(encoded) {
        if token.is_dynamic() {
            head.extend(uint_word((head_len + tail.len()) as u64));
            tail.extend(bytes);
        } else {
            head.extend(bytes);
        }
    }
    head.extend(tail);
    head
}

fn encode_token(token: &Token) -> Vec<u8> {
    match token {
        Token::Address(address) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(address.as_bytes());
            word.to_vec()
        }
        Token::Uint(value) => uint_word(*value),
        Token::Bool(value) => uint_word(u64::from(*value)),
        Token::String(value) => {
            let bytes = value.as_bytes();
            let mut out = uint_word(bytes.len() as u64);
            out.extend_from_slice(bytes);
            out.resize(WORD + padded_len(bytes.len()), 0);
            out
        }
        Token::Array(items) => {
            let mut out = uint_word(items.len() as u64);
            out.extend(encode(items));
            out
        }
        Token::Tuple(items) => encode(items),
    }
}

fn uint_word(value: u64) -> Vec<u8> {
    let mut word = vec![0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD) * WORD
}

/// Bounds-checked view over ABI-encoded return data.
struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn word(&self, pos: usize) -> Result<&'a [u8], AbiError> {
        let end = pos.checked_add(WORD).ok_or(AbiError::OutOfBounds(pos))?;
        self.data.get(pos..end).ok_or(AbiError::OutOfBounds(pos))
    }

    fn u64_at(&self, pos: usize) -> Result<u64, AbiError> {
        let word = self.word(pos)?;
        if word[..WORD - 8].iter().any(|b| *b != 0) {
            return Err(AbiError::Overflow(pos));
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&word[WORD - 8..]);
        Ok(u64::from_be_bytes(buf))
    }

    fn usize_at(&self, pos: usize) -> Result<usize, AbiError> {
        usize::try_from(self.u64_at(pos)?).map_err(|_| AbiError::Overflow(pos))
    }

    /// Resolve an offset stored at `pos`, relative to `base`.
    fn offset_at(&self, base: usize, pos: usize) -> Result<usize, AbiError> {
        base.checked_add(self.usize_at(pos)?)
            .ok_or(AbiError::Overflow(pos))
    }

    fn bool_at(&self, pos: usize) -> Result<bool, AbiError> {
        match self.u64_at(pos) {
            Ok(0) => Ok(false),
            Ok(1) => Ok(true),
            Ok(_) | Err(AbiError::Overflow(_)) => Err(AbiError::InvalidBool(pos)),
            Err(e) => Err(e),
        }
    }

    fn address_at(&self, pos: usize) -> Result<Address, AbiError> {
        let word = self.word(pos)?;
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&word[12..]);
        Ok(Address::new(bytes))
    }

    fn string_at(&self, pos: usize) -> Result<String, AbiError> {
        let len = self.usize_at(pos)?;
        let start = pos + WORD;
        let end = start.checked_add(len).ok_or(AbiError::Overflow(pos))?;
        let bytes = self.data.get(start..end).ok_or(AbiError::OutOfBounds(start))?;
        String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::InvalidUtf8(pos))
    }
}

/// Decode the `Email[]` returned by `getSentEmails`, `getReceivedEmails`
/// and `getStarredEmails`.
pub fn decode_messages(data: &[u8]) -> Result<Vec<Message>, AbiError> {
    let reader = Reader::new(data);
    let array = reader.offset_at(0, 0)?;
    let count = reader.usize_at(array)?;
    let elements = array + WORD;

    // Every element needs at least its offset word; reject absurd lengths
    // before allocating.
    let needed = count
        .checked_mul(WORD)
        .and_then(|n| n.checked_add(elements))
        .ok_or(AbiError::Overflow(array))?;
    if needed > data.len() {
        return Err(AbiError::OutOfBounds(elements));
    }

    let mut messages = Vec::with_capacity(count);
    for i in 0..count {
        let tuple = reader.offset_at(elements, elements + i * WORD)?;
        messages.push(decode_message(&reader, tuple)?);
    }
    Ok(messages)
}

fn decode_message(reader: &Reader<'_>, base: usize) -> Result<Message, AbiError> {
    Ok(Message {
        from: reader.address_at(base)?,
        to: reader.address_at(base + WORD)?,
        subject: reader.string_at(reader.offset_at(base, base + 2 * WORD)?)?,
        content: reader.string_at(reader.offset_at(base, base + 3 * WORD)?)?,
        timestamp: reader.u64_at(base + 4 * WORD)?,
        is_sent: reader.bool_at(base + 5 * WORD)?,
        is_starred: reader.bool_at(base + 6 * WORD)?,
        is_deleted: reader.bool_at(base + 7 * WORD)?,
    })
}

/// Decode the `(string name, string avatar, bool exists)` struct returned by
/// `getProfile`.
pub fn decode_profile(data: &[u8]) -> Result<Profile, AbiError> {
    let reader = Reader::new(data);
    let base = reader.offset_at(0, 0)?;
    let name = reader.string_at(reader.offset_at(base, base)?)?;
    let avatar = reader.string_at(reader.offset_at(base, base + WORD)?)?;
    let exists = reader.bool_at(base + 2 * WORD)?;
    Ok(Profile::from_contract(name, avatar, exists))
}

/// Tokens for one `Email` tuple, in contract field order.
pub fn message_tokens(message: &Message) -> Token {
    Token::Tuple(vec![
        Token::Address(message.from),
        Token::Address(message.to),
        Token::String(message.subject.clone()),
        Token::String(message.content.clone()),
        Token::Uint(message.timestamp),
        Token::Bool(message.is_sent),
        Token::Bool(message.is_starred),
        Token::Bool(message.is_deleted),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_hex(value: u64) -> String {
        format!("{:064x}", value)
    }

    #[test]
    fn test_selector_matches_known_signatures() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
        assert_eq!(hex::encode(selector("balanceOf(address)")), "70a08231");
    }

    #[test]
    fn test_encode_static_args() {
        let data = encode_call(STAR_EMAIL, &[Token::Uint(3), Token::Bool(true)]);
        assert_eq!(&data[..4], &selector(STAR_EMAIL));
        assert_eq!(hex::encode(&data[4..]), format!("{}{}", word_hex(3), word_hex(1)));
    }

    #[test]
    fn test_encode_dynamic_args_use_offsets() {
        let to = Address::new([0x22; 20]);
        let data = encode(&[
            Token::Address(to),
            Token::String("Hi".to_string()),
            Token::String("".to_string()),
        ]);
        let expected = format!(
            "{}{}{}{}{}{}",
            format!("{:0>64}", hex::encode(to.as_bytes())),
            word_hex(0x60),
            word_hex(0xa0),
            word_hex(2),
            format!("{:0<64}", hex::encode("Hi")),
            word_hex(0),
        );
        assert_eq!(hex::encode(data), expected);
    }

    #[test]
    fn test_decode_profile_from_fixed_bytes() {
        // Outer offset, then tuple head (name offset, avatar offset, exists),
        // then the two strings.
        let hex_data = format!(
            "{}{}{}{}{}{}{}",
            word_hex(0x20),
            word_hex(0x60),
            word_hex(0xa0),
            word_hex(1),
            word_hex(5),
            format!("{:0<64}", hex::encode("Alice")),
            word_hex(0),
        );
        let profile = decode_profile(&hex::decode(hex_data).unwrap()).unwrap();
        assert_eq!(profile.name.as_deref(), Some("Alice"));
        assert!(profile.avatar.is_none());
        assert!(profile.exists);
    }

    #[test]
    fn test_decode_message_list() {
        let message = Message {
            from: Address::new([0xb0; 20]),
            to: Address::new([0xa0; 20]),
            subject: "Hi".to_string(),
            content: "A body long enough to span more than one thirty-two byte word".to_string(),
            timestamp: 1_717_171_717,
            is_sent: false,
            is_starred: true,
            is_deleted: false,
        };
        let mut deleted = message.clone();
        deleted.subject = "gone".to_string();
        deleted.is_deleted = true;

        let data = encode(&[Token::Array(vec![
            message_tokens(&message),
            message_tokens(&deleted),
        ])]);
        let decoded = decode_messages(&data).unwrap();
        assert_eq!(decoded, vec![message, deleted]);
    }

    #[test]
    fn test_decode_empty_list() {
        let data = hex::decode(format!("{}{}", word_hex(0x20), word_hex(0))).unwrap();
        assert!(decode_messages(&data).unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_truncated_and_oversized() {
        assert_eq!(decode_messages(&[]), Err(AbiError::OutOfBounds(0)));

        let huge = hex::decode(format!("{}{}", word_hex(0x20), word_hex(1_000_000))).unwrap();
        assert!(matches!(decode_messages(&huge), Err(AbiError::OutOfBounds(_))));

        let bad_bool = hex::decode(format!(
            "{}{}{}{}{}",
            word_hex(0x20),
            word_hex(0x60),
            word_hex(0x60),
            word_hex(2),
            word_hex(0),
        ))
        .unwrap();
        assert_eq!(decode_profile(&bad_bool), Err(AbiError::InvalidBool(0x60)));
    }
}
