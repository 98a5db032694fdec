//! # 标识符与随机字符串生成
//!
//! - 订单号: 去掉连字符的 UUID v4
//! - 支付订单 ID: `YYYYMMDDhhmmss` + 业务标识 + 4 位秒内序号 + 6 位随机数
//! - 随机字符串: 每次调用使用新播种的非加密随机数生成器
//! - 密钥: 操作系统随机源，base64 编码

use std::sync::{LazyLock, Mutex, PoisonError};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use bitflags::bitflags;
use chrono::{DateTime, Local};
use rand::rngs::{OsRng, SmallRng};
use rand::{Rng, RngCore, SeedableRng};

use crate::error::{AuthError, Result};

/// 字母表
pub const LETTER_BYTES: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
/// 数字表
pub const NUM_BYTES: &[u8] = b"0123456789";
/// 特殊字符表
pub const SPECIAL_BYTES: &[u8] = b"!@#$%^&*()_+-=[]{}\\|;':\",.<>/?`~";

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const SEQUENCE_MODULUS: u64 = 10_000;

bitflags! {
    /// 随机字符串可选字符集
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Charset: u8 {
        const LETTERS = 0b001;
        const DIGITS = 0b010;
        const SPECIAL = 0b100;
    }
}

impl Charset {
    /// 组合后的字符表，空集合退化为字母表
    #[must_use]
    pub fn alphabet(self) -> Vec<u8> {
        let set = if self.is_empty() { Self::LETTERS } else { self };
        let mut alphabet = Vec::with_capacity(LETTER_BYTES.len() + NUM_BYTES.len() + SPECIAL_BYTES.len());
        if set.contains(Self::LETTERS) {
            alphabet.extend_from_slice(LETTER_BYTES);
        }
        if set.contains(Self::DIGITS) {
            alphabet.extend_from_slice(NUM_BYTES);
        }
        if set.contains(Self::SPECIAL) {
            alphabet.extend_from_slice(SPECIAL_BYTES);
        }
        alphabet
    }
}

/// 支付渠道到业务标识的映射，未知渠道为 `UNK`
#[must_use]
pub fn business_code(payment_type: &str) -> &'static str {
    match payment_type {
        "alipay" => "ALI",
        "wechat" => "WX",
        "union" => "UN",
        _ => "UNK",
    }
}

#[derive(Debug, Default)]
struct SequenceState {
    second: String,
    counter: u64,
}

/// 支付订单 ID 生成器
///
/// 同一秒内的原始序号由互斥锁保护，严格递增且不重复。
/// 进入新的一秒时计数器从 1 重新开始。
#[derive(Debug, Default)]
pub struct OrderIdGenerator {
    state: Mutex<SequenceState>,
}

impl OrderIdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 生成支付订单 ID
    #[must_use]
    pub fn next_id(&self, payment_type: &str) -> String {
        let (timestamp, raw) = self.next_sequence_with(Local::now);
        compose_order_id(&timestamp, payment_type, raw)
    }

    /// 使用指定时间生成支付订单 ID
    #[must_use]
    pub fn next_id_at(&self, payment_type: &str, now: DateTime<Local>) -> String {
        let (timestamp, raw) = self.next_sequence_with(|| now);
        compose_order_id(&timestamp, payment_type, raw)
    }

    /// 取得当前秒的时间戳和原始序号
    ///
    /// 时间戳在锁内读取，保证与计数器归属同一秒。
    /// 时钟回拨时不重置计数器，已用过的秒不会再得到相同序号。
    pub fn next_sequence(&self) -> (String, u64) {
        self.next_sequence_with(Local::now)
    }

    fn next_sequence_with<F>(&self, now: F) -> (String, u64)
    where
        F: FnOnce() -> DateTime<Local>,
    {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let timestamp = now().format(TIMESTAMP_FORMAT).to_string();
        // 固定宽度的数字时间戳，字典序即时间顺序
        if timestamp > state.second {
            state.second.clone_from(&timestamp);
            state.counter = 0;
        }
        state.counter += 1;
        (timestamp, state.counter)
    }
}

fn compose_order_id(timestamp: &str, payment_type: &str, raw: u64) -> String {
    let random: u32 = SmallRng::from_entropy().gen_range(0..1_000_000);
    format!(
        "{timestamp}{}{:04}{random:06}",
        business_code(payment_type),
        raw % SEQUENCE_MODULUS
    )
}

static DEFAULT_ORDER_ID_GENERATOR: LazyLock<OrderIdGenerator> = LazyLock::new(OrderIdGenerator::new);

/// 进程级默认生成器
#[must_use]
pub fn default_order_id_generator() -> &'static OrderIdGenerator {
    &DEFAULT_ORDER_ID_GENERATOR
}

/// 使用默认生成器生成支付订单 ID
#[must_use]
pub fn generate_order_id(payment_type: &str) -> String {
    DEFAULT_ORDER_ID_GENERATOR.next_id(payment_type)
}

/// 订单号：32 位十六进制
#[must_use]
pub fn generate_order_no() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// 从字符表中随机取 `length` 个字符
#[must_use]
pub fn random_from_alphabet(alphabet: &[u8], length: usize) -> String {
    if alphabet.is_empty() {
        return String::new();
    }
    let mut rng = SmallRng::from_entropy();
    (0..length)
        .map(|_| char::from(alphabet[rng.gen_range(0..alphabet.len())]))
        .collect()
}

/// 字母加数字组成的名称
#[must_use]
pub fn generate_name(length: usize) -> String {
    random_from_alphabet(&(Charset::LETTERS | Charset::DIGITS).alphabet(), length)
}

/// 随机密码，所选字符集合并使用，全部未选时使用字母
///
/// 与旧版只取优先级最高的字符集（字母、特殊字符、数字）不同，
/// 这里从所有选中字符集的并集中抽取。
#[must_use]
pub fn generate_random_password(length: usize, use_letters: bool, use_special: bool, use_num: bool) -> String {
    let mut charset = Charset::empty();
    charset.set(Charset::LETTERS, use_letters);
    charset.set(Charset::SPECIAL, use_special);
    charset.set(Charset::DIGITS, use_num);
    random_from_alphabet(&charset.alphabet(), length)
}

#[must_use]
pub fn generate_random_string(length: usize) -> String {
    random_from_alphabet(LETTER_BYTES, length)
}

#[must_use]
pub fn generate_random_number(length: usize) -> String {
    random_from_alphabet(NUM_BYTES, length)
}

#[must_use]
pub fn generate_random_special(length: usize) -> String {
    random_from_alphabet(SPECIAL_BYTES, length)
}

#[must_use]
pub fn generate_random_mixed(length: usize) -> String {
    random_from_alphabet(&Charset::all().alphabet(), length)
}

/// 生成 `length` 字节的安全随机密钥，标准 base64 编码
pub fn generate_key(length: usize) -> Result<String> {
    let mut bytes = vec![0u8; length];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::Random(e.to_string()))?;
    Ok(STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use regex::Regex;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_order_id_shape() {
        let re = Regex::new(r"^\d{14}WX\d{4}\d{6}$").unwrap();
        let id = generate_order_id("wechat");
        assert!(re.is_match(&id), "unexpected id: {id}");
        assert_eq!(id.len(), 26);

        assert!(generate_order_id("alipay").contains("ALI"));
        assert!(generate_order_id("union").contains("UN"));
        let unknown = generate_order_id("paypal");
        assert_eq!(&unknown[14..17], "UNK");
        assert_eq!(unknown.len(), 27);
    }

    #[test]
    fn test_sequence_resets_each_second() {
        let generator = OrderIdGenerator::new();
        let first = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let second = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 1).unwrap();

        let a = generator.next_id_at("wechat", first);
        let b = generator.next_id_at("wechat", first);
        let c = generator.next_id_at("wechat", second);

        assert_eq!(&a[..16], "20240501120000WX");
        assert_eq!(&a[16..20], "0001");
        assert_eq!(&b[16..20], "0002");
        assert_eq!(&c[..14], "20240501120001");
        assert_eq!(&c[16..20], "0001");
    }

    #[test]
    fn test_clock_step_back_does_not_reuse_sequence() {
        let generator = OrderIdGenerator::new();
        let a = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let b = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 1).unwrap();

        let first = generator.next_sequence_with(|| a);
        let later = generator.next_sequence_with(|| b);
        let again = generator.next_sequence_with(|| a);
        let back = generator.next_sequence_with(|| b);

        assert_eq!(first, ("20240501120000".to_string(), 1));
        assert_eq!(later, ("20240501120001".to_string(), 1));
        assert_ne!(again, first);
        assert_eq!(again, ("20240501120000".to_string(), 2));
        assert_eq!(back, ("20240501120001".to_string(), 3));
    }

    #[test]
    fn test_sequence_wraps_at_ten_thousand() {
        let generator = OrderIdGenerator::new();
        let at = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        for _ in 0..9_999 {
            let _ = generator.next_sequence_with(|| at);
        }
        let id = generator.next_id_at("alipay", at);
        assert_eq!(&id[17..21], "0000");
    }

    #[test]
    fn test_concurrent_callers_get_distinct_raw_sequence() {
        let generator = Arc::new(OrderIdGenerator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || {
                    (0..200).map(|_| generator.next_sequence()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for pair in handle.join().unwrap() {
                assert!(seen.insert(pair), "duplicate sequence observed");
            }
        }
        assert_eq!(seen.len(), 1600);
    }

    #[test]
    fn test_order_no_is_32_hex() {
        let no = generate_order_no();
        assert_eq!(no.len(), 32);
        assert!(no.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_random_strings_respect_alphabets() {
        assert_eq!(generate_random_string(16).len(), 16);
        assert!(generate_random_string(32).bytes().all(|b| LETTER_BYTES.contains(&b)));
        assert!(generate_random_number(32).bytes().all(|b| b.is_ascii_digit()));
        assert!(generate_random_special(32).bytes().all(|b| SPECIAL_BYTES.contains(&b)));
        assert!(generate_name(32).bytes().all(|b| b.is_ascii_alphanumeric()));
        assert_eq!(generate_random_mixed(0), "");
    }

    #[test]
    fn test_password_alphabets() {
        let digits_only = generate_random_password(64, false, false, true);
        assert!(digits_only.bytes().all(|b| b.is_ascii_digit()));

        let fallback = generate_random_password(64, false, false, false);
        assert!(fallback.bytes().all(|b| b.is_ascii_alphabetic()));

        let mixed = generate_random_password(64, true, true, true);
        assert!(mixed.bytes().all(|b| Charset::all().alphabet().contains(&b)));
    }

    #[test]
    fn test_generate_key_decodes_to_requested_length() {
        let key = generate_key(32).unwrap();
        assert_eq!(STANDARD.decode(key).unwrap().len(), 32);
    }
}
