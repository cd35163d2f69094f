//! 短码编码器
//!
//! Hashids-style encoding of the counter digits: a salted consistent shuffle
//! of the alphabet, separators between numbers, guard characters and
//! alphabet padding up to the minimum length. Codes are never decoded.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::info;

use crate::errors::{Result, ShardlinkError};
use crate::storage::SettingsStore;

/// 盐值在 settings 表中的键
pub const SALT_SETTING: &str = "link_hashid_salt";

const DEFAULT_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890";
const DEFAULT_SEPARATORS: &str = "cfhistuCFHISTU";
const SEPARATOR_DIV: f64 = 3.5;
const GUARD_DIV: f64 = 12.0;

#[derive(Debug, Clone)]
pub struct CodeEncoder {
    salt: Vec<char>,
    alphabet: Vec<char>,
    separators: Vec<char>,
    guards: Vec<char>,
    min_length: usize,
}

impl CodeEncoder {
    pub fn new(salt: &str, min_length: usize) -> Self {
        let salt: Vec<char> = salt.chars().collect();

        let mut separators: Vec<char> = DEFAULT_SEPARATORS.chars().collect();
        let mut alphabet: Vec<char> = DEFAULT_ALPHABET
            .chars()
            .filter(|c| !separators.contains(c))
            .collect();

        consistent_shuffle(&mut separators, &salt);

        let ratio = alphabet.len() as f64 / separators.len() as f64;
        if separators.is_empty() || ratio > SEPARATOR_DIV {
            let wanted = ((alphabet.len() as f64 / SEPARATOR_DIV).ceil() as usize).max(2);
            if wanted > separators.len() {
                let diff = wanted - separators.len();
                separators.extend(alphabet.drain(..diff));
            } else {
                separators.truncate(wanted);
            }
        }

        consistent_shuffle(&mut alphabet, &salt);

        let guard_count = (alphabet.len() as f64 / GUARD_DIV).ceil() as usize;
        let guards: Vec<char> = if alphabet.len() < 3 {
            separators.drain(..guard_count).collect()
        } else {
            alphabet.drain(..guard_count).collect()
        };

        Self {
            salt,
            alphabet,
            separators,
            guards,
            min_length,
        }
    }

    /// 读取持久化盐值；首次启动时生成 32 字节随机盐值并写入
    pub async fn load_salt(settings: &dyn SettingsStore) -> Result<String> {
        if let Some(salt) = settings.get_setting(SALT_SETTING).await? {
            return Ok(salt);
        }

        let generated = STANDARD.encode(rand::random::<[u8; 32]>());
        if settings
            .insert_setting_if_absent(SALT_SETTING, &generated)
            .await?
        {
            info!("Generated new short code salt");
        }

        // 并发初始化时以先写入者为准
        settings
            .get_setting(SALT_SETTING)
            .await?
            .ok_or_else(|| ShardlinkError::internal("salt missing right after insert"))
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// 编码计数器分片
    pub fn encode(&self, digits: &[i64]) -> Result<String> {
        if digits.is_empty() {
            return Err(ShardlinkError::internal("cannot encode an empty digit list"));
        }
        let numbers = digits
            .iter()
            .map(|&d| {
                u64::try_from(d)
                    .map_err(|_| ShardlinkError::internal(format!("negative counter digit {}", d)))
            })
            .collect::<Result<Vec<u64>>>()?;

        Ok(self.encode_numbers(&numbers))
    }

    fn encode_numbers(&self, numbers: &[u64]) -> String {
        let mut alphabet = self.alphabet.clone();
        let alphabet_len = alphabet.len() as u64;

        let numbers_hash: u64 = numbers
            .iter()
            .enumerate()
            .map(|(i, n)| n % (i as u64 + 100))
            .sum();

        let lottery = alphabet[(numbers_hash % alphabet_len) as usize];
        let mut result: Vec<char> = vec![lottery];
        let mut buffer: Vec<char> = Vec::with_capacity(1 + self.salt.len() + alphabet.len());

        for (i, &number) in numbers.iter().enumerate() {
            buffer.clear();
            buffer.push(lottery);
            buffer.extend_from_slice(&self.salt);
            buffer.extend_from_slice(&alphabet);
            buffer.truncate(alphabet.len());
            consistent_shuffle(&mut alphabet, &buffer);

            let start = result.len();
            hash(number, &alphabet, &mut result);

            if i + 1 < numbers.len() {
                let first = result[start] as u64;
                let reduced = number % (first + i as u64);
                let sep = self.separators[(reduced % self.separators.len() as u64) as usize];
                result.push(sep);
            }
        }

        if result.len() < self.min_length {
            let guard_index = (numbers_hash + result[0] as u64) % self.guards.len() as u64;
            result.insert(0, self.guards[guard_index as usize]);

            if result.len() < self.min_length {
                let guard_index = (numbers_hash + result[2] as u64) % self.guards.len() as u64;
                result.push(self.guards[guard_index as usize]);
            }
        }

        let half = alphabet.len() / 2;
        while result.len() < self.min_length {
            let key = alphabet.clone();
            consistent_shuffle(&mut alphabet, &key);

            let mut padded = Vec::with_capacity(alphabet.len() + result.len());
            padded.extend_from_slice(&alphabet[half..]);
            padded.extend_from_slice(&result);
            padded.extend_from_slice(&alphabet[..half]);
            result = padded;

            let excess = result.len().saturating_sub(self.min_length);
            if excess > 0 {
                let from = excess / 2;
                result = result[from..from + self.min_length].to_vec();
            }
        }

        result.into_iter().collect()
    }
}

/// 以盐值为 key 的确定性洗牌
fn consistent_shuffle(alphabet: &mut [char], salt: &[char]) {
    if salt.is_empty() || alphabet.len() < 2 {
        return;
    }

    let mut v = 0usize;
    let mut p = 0usize;
    for i in (1..alphabet.len()).rev() {
        v %= salt.len();
        let integer = salt[v] as usize;
        p += integer;
        let j = (integer + v + p) % i;
        alphabet.swap(i, j);
        v += 1;
    }
}

/// 把一个数按当前字母表转写，追加到 out
fn hash(mut number: u64, alphabet: &[char], out: &mut Vec<char>) {
    let base = alphabet.len() as u64;
    let start = out.len();
    loop {
        out.push(alphabet[(number % base) as usize]);
        number /= base;
        if number == 0 {
            break;
        }
    }
    out[start..].reverse();
}
