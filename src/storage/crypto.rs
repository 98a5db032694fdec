//! # 管理 API 载荷加密
//!
//! MinIO 管理接口对敏感载荷（新建用户的密钥、用户列表）使用管理员密钥加密。
//! 格式：`salt(32) | id(1) | nonce(8) | 密文`，
//! 密钥由 Argon2id(t=1, m=64MiB, p=4) 派生，密文按 16KiB 分片用 AES-256-GCM 封装。
//!
//! 每个分片的 nonce 为 `nonce(8) | LE32(序号)`，序号 0 只用于派生附加数据，
//! 附加数据首字节标记分片是否为最后一片。

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::{HtxpError, Result};

const SALT_LEN: usize = 32;
const NONCE_PREFIX_LEN: usize = 8;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = SALT_LEN + 1 + NONCE_PREFIX_LEN;
const FRAGMENT_SIZE: usize = 16 * 1024;

/// Argon2id + AES-256-GCM
pub const ARGON2ID_AES_GCM: u8 = 0x00;

const FINAL_FLAG: u8 = 0x80;

fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; 32]> {
    let params = Params::new(64 * 1024, 1, 4, Some(32))
        .map_err(|e| HtxpError::internal(format!("Argon2参数无效: {e}")))?;
    let mut key = [0u8; 32];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| HtxpError::internal(format!("密钥派生失败: {e}")))?;
    Ok(key)
}

struct FragmentCipher {
    cipher: Aes256Gcm,
    nonce: [u8; 12],
    sequence: u32,
    associated_data: Vec<u8>,
}

impl FragmentCipher {
    fn new(key: &[u8; 32], nonce_prefix: &[u8]) -> Result<Self> {
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| HtxpError::internal(format!("AES密钥长度无效: {e}")))?;
        let mut nonce = [0u8; 12];
        nonce[..NONCE_PREFIX_LEN].copy_from_slice(nonce_prefix);

        let mut fragment = Self {
            cipher,
            nonce,
            sequence: 0,
            associated_data: Vec::new(),
        };
        let nonce = fragment.next_nonce();
        let tag = fragment
            .cipher
            .encrypt(Nonce::from_slice(&nonce), Payload { msg: &[], aad: &[] })
            .map_err(|_| HtxpError::internal("派生附加数据失败"))?;
        fragment.associated_data = Vec::with_capacity(1 + TAG_LEN);
        fragment.associated_data.push(0);
        fragment.associated_data.extend_from_slice(&tag);
        Ok(fragment)
    }

    fn next_nonce(&mut self) -> [u8; 12] {
        self.nonce[NONCE_PREFIX_LEN..].copy_from_slice(&self.sequence.to_le_bytes());
        self.sequence = self.sequence.wrapping_add(1);
        self.nonce
    }

    fn seal(&mut self, plaintext: &[u8], last: bool) -> Result<Vec<u8>> {
        if last {
            self.associated_data[0] = FINAL_FLAG;
        }
        let nonce = self.next_nonce();
        self.cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: &self.associated_data,
                },
            )
            .map_err(|_| HtxpError::internal("加密失败"))
    }

    fn open(&mut self, ciphertext: &[u8], last: bool) -> Result<Vec<u8>> {
        if last {
            self.associated_data[0] = FINAL_FLAG;
        }
        let nonce = self.next_nonce();
        self.cipher
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: ciphertext,
                    aad: &self.associated_data,
                },
            )
            .map_err(|_| HtxpError::storage("管理接口响应解密失败，请检查密钥"))
    }
}

/// 使用密码加密数据
pub fn encrypt_data(password: &str, data: &[u8]) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce_prefix = [0u8; NONCE_PREFIX_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut nonce_prefix);
    encrypt_with(password, data, &salt, &nonce_prefix)
}

fn encrypt_with(password: &str, data: &[u8], salt: &[u8; SALT_LEN], nonce_prefix: &[u8; NONCE_PREFIX_LEN]) -> Result<Vec<u8>> {
    let key = derive_key(password, salt)?;
    let mut fragments = FragmentCipher::new(&key, nonce_prefix)?;

    let fragment_count = data.len().div_ceil(FRAGMENT_SIZE).max(1);
    let mut output = Vec::with_capacity(HEADER_LEN + data.len() + fragment_count * TAG_LEN);
    output.extend_from_slice(salt);
    output.push(ARGON2ID_AES_GCM);
    output.extend_from_slice(nonce_prefix);

    if data.is_empty() {
        output.extend(fragments.seal(&[], true)?);
        return Ok(output);
    }
    for (index, chunk) in data.chunks(FRAGMENT_SIZE).enumerate() {
        output.extend(fragments.seal(chunk, index + 1 == fragment_count)?);
    }
    Ok(output)
}

/// 解密 [`encrypt_data`] 格式的数据
pub fn decrypt_data(password: &str, data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < HEADER_LEN + TAG_LEN {
        return Err(HtxpError::storage("加密数据长度不足"));
    }
    let (salt, rest) = data.split_at(SALT_LEN);
    let (id, rest) = rest.split_at(1);
    let (nonce_prefix, ciphertext) = rest.split_at(NONCE_PREFIX_LEN);
    if id[0] != ARGON2ID_AES_GCM {
        return Err(HtxpError::storage(format!("不支持的加密算法标识: {:#04x}", id[0])));
    }

    let key = derive_key(password, salt)?;
    let mut fragments = FragmentCipher::new(&key, nonce_prefix)?;

    let sealed_size = FRAGMENT_SIZE + TAG_LEN;
    let fragment_count = ciphertext.len().div_ceil(sealed_size);
    let mut plaintext = Vec::with_capacity(ciphertext.len());
    for (index, chunk) in ciphertext.chunks(sealed_size).enumerate() {
        plaintext.extend(fragments.open(chunk, index + 1 == fragment_count)?);
    }
    Ok(plaintext)
}
