//! Just enough of the Solidity ABI to talk to the randomness contract.

use sha3::{
    Digest,
    Keccak256,
};
use thiserror::Error;

const WORD: usize = 32;

pub const GET_RANDOM_NUMBER_SIGNATURE: &str = "getRandomNumber(uint64,uint64)";
pub const SELECT_RANDOM_ITEM_SIGNATURE: &str = "selectRandomItem(string[])";
pub const RANDOM_NUMBER_GENERATED_SIGNATURE: &str =
    "RandomNumberGenerated(uint64,uint64,uint64)";
pub const RANDOM_ITEM_SELECTED_SIGNATURE: &str = "RandomItemSelected(string,uint256)";

#[derive(Debug, Error, Eq, PartialEq)]
pub enum AbiError {
    #[error("return data too short: need {needed} bytes, got {got}")]
    TooShort { needed: usize, got: usize },
    #[error("value does not fit in {0}")]
    Overflow(&'static str),
    #[error("string is not valid utf-8")]
    InvalidUtf8,
}

pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(bytes));
    out
}

pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

pub fn event_topic(signature: &str) -> String {
    format!("0x{}", hex::encode(keccak256(signature.as_bytes())))
}

pub fn encode_get_random_number(min: u64, max: u64) -> Vec<u8> {
    let mut out = selector(GET_RANDOM_NUMBER_SIGNATURE).to_vec();
    out.extend_from_slice(&uint_word(u128::from(min)));
    out.extend_from_slice(&uint_word(u128::from(max)));
    out
}

pub fn encode_select_random_item<S: AsRef<str>>(items: &[S]) -> Vec<u8> {
    let mut out = selector(SELECT_RANDOM_ITEM_SIGNATURE).to_vec();
    // single dynamic argument: head is the offset of the array
    out.extend_from_slice(&uint_word(WORD as u128));
    out.extend_from_slice(&encode_string_array(items));
    out
}

fn encode_string_array<S: AsRef<str>>(items: &[S]) -> Vec<u8> {
    let encoded: Vec<Vec<u8>> = items.iter().map(|s| encode_string(s.as_ref())).collect();
    let mut out = uint_word(items.len() as u128).to_vec();
    // element offsets are relative to the start of the offset table
    let mut offset = items.len() * WORD;
    for item in &encoded {
        out.extend_from_slice(&uint_word(offset as u128));
        offset += item.len();
    }
    for item in encoded {
        out.extend_from_slice(&item);
    }
    out
}

fn encode_string(value: &str) -> Vec<u8> {
    let bytes = value.as_bytes();
    let mut out = uint_word(bytes.len() as u128).to_vec();
    out.extend_from_slice(bytes);
    let padding = (WORD - bytes.len() % WORD) % WORD;
    out.extend(std::iter::repeat_n(0u8, padding));
    out
}

fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    let end = offset.checked_add(WORD).ok_or(AbiError::Overflow("usize"))?;
    data.get(offset..end).ok_or(AbiError::TooShort {
        needed: end,
        got: data.len(),
    })
}

fn read_uint(data: &[u8], offset: usize, bytes: usize, ty: &'static str) -> Result<u128, AbiError> {
    let word = word_at(data, offset)?;
    if word[..WORD - bytes].iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow(ty));
    }
    let mut buf = [0u8; 16];
    buf[16 - bytes..].copy_from_slice(&word[WORD - bytes..]);
    Ok(u128::from_be_bytes(buf))
}

pub fn decode_uint64(data: &[u8], offset: usize) -> Result<u64, AbiError> {
    let value = read_uint(data, offset, 8, "uint64")?;
    u64::try_from(value).map_err(|_| AbiError::Overflow("uint64"))
}

fn decode_usize(data: &[u8], offset: usize) -> Result<usize, AbiError> {
    let value = read_uint(data, offset, 16, "usize")?;
    usize::try_from(value).map_err(|_| AbiError::Overflow("usize"))
}

/// Decodes a `string` whose head word sits at `head`.
pub fn decode_string(data: &[u8], head: usize) -> Result<String, AbiError> {
    let start = decode_usize(data, head)?;
    let len = decode_usize(data, start)?;
    let body = start + WORD;
    let end = body.checked_add(len).ok_or(AbiError::Overflow("usize"))?;
    let bytes = data.get(body..end).ok_or(AbiError::TooShort {
        needed: end,
        got: data.len(),
    })?;
    String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::InvalidUtf8)
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ContractEvent {
    RandomNumberGenerated {
        random_number: u64,
        min: u64,
        max: u64,
    },
    RandomItemSelected {
        item: String,
        index: u128,
    },
}

/// Decodes a log emitted by the randomness contract. `None` if the log is not
/// one of its events.
pub fn decode_event(topics: &[String], data: &[u8]) -> Option<ContractEvent> {
    let topic = topics.first()?.to_ascii_lowercase();
    if topic == event_topic(RANDOM_NUMBER_GENERATED_SIGNATURE) {
        Some(ContractEvent::RandomNumberGenerated {
            random_number: decode_uint64(data, 0).ok()?,
            min: decode_uint64(data, WORD).ok()?,
            max: decode_uint64(data, 2 * WORD).ok()?,
        })
    } else if topic == event_topic(RANDOM_ITEM_SELECTED_SIGNATURE) {
        Some(ContractEvent::RandomItemSelected {
            item: decode_string(data, 0).ok()?,
            index: read_uint(data, WORD, 16, "uint256").ok()?,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn word(value: u128) -> Vec<u8> {
        uint_word(value).to_vec()
    }

    #[test]
    fn selector__matches_known_erc20_transfer() {
        assert_eq!(
            hex::encode(selector("transfer(address,uint256)")),
            "a9059cbb"
        );
    }

    #[test]
    fn encode_get_random_number__packs_two_words_after_selector() {
        // when
        let data = encode_get_random_number(1, 100);

        // then
        assert_eq!(data.len(), 4 + 2 * WORD);
        assert_eq!(&data[..4], &selector(GET_RANDOM_NUMBER_SIGNATURE));
        assert_eq!(decode_uint64(&data[4..], 0).unwrap(), 1);
        assert_eq!(decode_uint64(&data[4..], WORD).unwrap(), 100);
    }

    #[test]
    fn encode_select_random_item__lays_out_offsets_then_strings() {
        // given
        let items = ["ab", "c"];

        // when
        let data = encode_select_random_item(&items);

        // then
        let mut expected = selector(SELECT_RANDOM_ITEM_SIGNATURE).to_vec();
        expected.extend(word(0x20));
        expected.extend(word(2));
        expected.extend(word(0x40));
        expected.extend(word(0x80));
        expected.extend(word(2));
        let mut ab = b"ab".to_vec();
        ab.resize(WORD, 0);
        expected.extend(ab);
        expected.extend(word(1));
        let mut c = b"c".to_vec();
        c.resize(WORD, 0);
        expected.extend(c);
        assert_eq!(data, expected);
    }

    #[test]
    fn decode_string__reads_returned_string() {
        // given
        let mut data = word(0x20);
        data.extend(word(14));
        let mut body = b"Mystic Crystal".to_vec();
        body.resize(WORD, 0);
        data.extend(body);

        // when
        let value = decode_string(&data, 0).unwrap();

        // then
        assert_eq!(value, "Mystic Crystal");
    }

    #[test]
    fn decode_string__rejects_truncated_data() {
        let mut data = word(0x20);
        data.extend(word(40));

        let err = decode_string(&data, 0).unwrap_err();

        assert!(matches!(err, AbiError::TooShort { .. }));
    }

    #[test]
    fn decode_uint64__rejects_values_wider_than_64_bits() {
        let data = word(u128::from(u64::MAX) + 1);

        assert_eq!(decode_uint64(&data, 0), Err(AbiError::Overflow("uint64")));
    }

    #[test]
    fn decode_event__parses_random_number_generated() {
        // given
        let topics = vec![event_topic(RANDOM_NUMBER_GENERATED_SIGNATURE)];
        let mut data = word(17);
        data.extend(word(1));
        data.extend(word(100));

        // when
        let event = decode_event(&topics, &data);

        // then
        assert_eq!(
            event,
            Some(ContractEvent::RandomNumberGenerated {
                random_number: 17,
                min: 1,
                max: 100,
            })
        );
    }

    #[test]
    fn decode_event__parses_random_item_selected() {
        // given
        let topics = vec![event_topic(RANDOM_ITEM_SELECTED_SIGNATURE)];
        let mut data = word(0x40);
        data.extend(word(3));
        data.extend(word(13));
        let mut body = b"Celestial Orb".to_vec();
        body.resize(WORD, 0);
        data.extend(body);

        // when
        let event = decode_event(&topics, &data);

        // then
        assert_eq!(
            event,
            Some(ContractEvent::RandomItemSelected {
                item: String::from("Celestial Orb"),
                index: 3,
            })
        );
    }

    #[test]
    fn decode_event__ignores_foreign_topics() {
        let topics = vec![event_topic("Transfer(address,address,uint256)")];

        assert_eq!(decode_event(&topics, &[]), None);
    }
}
