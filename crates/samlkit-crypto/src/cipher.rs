#![forbid(unsafe_code)]

//! Block cipher algorithms for `EncryptedData` (AES-CBC, AES-GCM, 3DES-CBC).
//!
//! Ciphertext layout follows XML Encryption: the IV (or GCM nonce) is
//! prepended to the encrypted bytes, and for GCM the tag is appended.

use samlkit_core::{algorithm, Error, Result};

/// Trait for data-encryption algorithms.
pub trait CipherAlgorithm: Send + Sync {
    fn uri(&self) -> &'static str;
    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>;
    /// Any integrity or padding failure is reported as
    /// [`Error::DecryptionFailure`].
    fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>>;
    fn key_size(&self) -> usize;

    /// Fresh random key of the right length.
    fn generate_key(&self) -> Vec<u8> {
        use rand::RngCore;
        let mut key = vec![0u8; self.key_size()];
        rand::thread_rng().fill_bytes(&mut key);
        key
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Cbc,
    Gcm,
    TripleDes,
}

struct BlockCipher {
    uri: &'static str,
    mode: Mode,
    key_size: usize,
}

const CIPHERS: &[(&str, Mode, usize)] = &[
    (algorithm::AES128_CBC, Mode::Cbc, 16),
    (algorithm::AES192_CBC, Mode::Cbc, 24),
    (algorithm::AES256_CBC, Mode::Cbc, 32),
    (algorithm::AES128_GCM, Mode::Gcm, 16),
    (algorithm::AES192_GCM, Mode::Gcm, 24),
    (algorithm::AES256_GCM, Mode::Gcm, 32),
    (algorithm::TRIPLEDES_CBC, Mode::TripleDes, 24),
];

/// Create a cipher algorithm from its URI.
pub fn from_uri(uri: &str) -> Result<Box<dyn CipherAlgorithm>> {
    CIPHERS
        .iter()
        .find(|(u, _, _)| *u == uri)
        .map(|&(uri, mode, key_size)| {
            Box::new(BlockCipher { uri, mode, key_size }) as Box<dyn CipherAlgorithm>
        })
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("cipher: {uri}")))
}

impl CipherAlgorithm for BlockCipher {
    fn uri(&self) -> &'static str {
        self.uri
    }

    fn key_size(&self) -> usize {
        self.key_size
    }

    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        self.check_key(key)?;
        match self.mode {
            Mode::Cbc | Mode::TripleDes => self.cbc_encrypt(key, plaintext),
            Mode::Gcm => self.gcm_encrypt(key, plaintext),
        }
    }

    fn decrypt(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        self.check_key(key)?;
        match self.mode {
            Mode::Cbc | Mode::TripleDes => self.cbc_decrypt(key, data),
            Mode::Gcm => self.gcm_decrypt(key, data),
        }
    }
}

impl BlockCipher {
    fn check_key(&self, key: &[u8]) -> Result<()> {
        if key.len() != self.key_size {
            return Err(Error::Crypto(format!(
                "{}: expected {} byte key, got {}",
                self.uri,
                self.key_size,
                key.len()
            )));
        }
        Ok(())
    }

    fn block_size(&self) -> usize {
        if self.mode == Mode::TripleDes {
            8
        } else {
            16
        }
    }

    fn cbc_encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        use cbc::cipher::{block_padding::NoPadding, BlockEncryptMut, KeyIvInit};
        use rand::RngCore;

        let bs = self.block_size();
        let mut iv = vec![0u8; bs];
        rand::thread_rng().fill_bytes(&mut iv);

        let mut buf = pkcs7_pad(plaintext, bs);
        let len = buf.len();

        macro_rules! run {
            ($c:ty) => {{
                cbc::Encryptor::<$c>::new_from_slices(key, &iv)
                    .map_err(|e| Error::Crypto(format!("CBC init: {e}")))?
                    .encrypt_padded_mut::<NoPadding>(&mut buf, len)
                    .map_err(|e| Error::Encryption(format!("CBC encrypt: {e}")))?;
            }};
        }
        match (self.mode, self.key_size) {
            (Mode::TripleDes, _) => run!(des::TdesEde3),
            (_, 16) => run!(aes::Aes128),
            (_, 24) => run!(aes::Aes192),
            _ => run!(aes::Aes256),
        }

        iv.extend_from_slice(&buf);
        Ok(iv)
    }

    fn cbc_decrypt(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        use cbc::cipher::{block_padding::NoPadding, BlockDecryptMut, KeyIvInit};

        let bs = self.block_size();
        if data.len() < 2 * bs || data.len() % bs != 0 {
            return Err(Error::DecryptionFailure(format!(
                "{}: ciphertext length {} is not a whole number of blocks",
                self.uri,
                data.len()
            )));
        }
        let (iv, ct) = data.split_at(bs);
        let mut buf = ct.to_vec();

        macro_rules! run {
            ($c:ty) => {{
                cbc::Decryptor::<$c>::new_from_slices(key, iv)
                    .map_err(|e| Error::Crypto(format!("CBC init: {e}")))?
                    .decrypt_padded_mut::<NoPadding>(&mut buf)
                    .map_err(|e| Error::DecryptionFailure(format!("CBC decrypt: {e}")))?;
            }};
        }
        match (self.mode, self.key_size) {
            (Mode::TripleDes, _) => run!(des::TdesEde3),
            (_, 16) => run!(aes::Aes128),
            (_, 24) => run!(aes::Aes192),
            _ => run!(aes::Aes256),
        }

        xmlenc_unpad(&buf, bs)
    }

    fn gcm_encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        use aes_gcm::aead::{consts::U12, Aead};
        use aes_gcm::{KeyInit, Nonce};
        use rand::RngCore;

        let mut nonce = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce);
        let n = Nonce::from_slice(&nonce);

        macro_rules! run {
            ($c:ty) => {
                <$c>::new_from_slice(key)
                    .map_err(|e| Error::Crypto(format!("AES-GCM init: {e}")))?
                    .encrypt(n, plaintext)
                    .map_err(|e| Error::Encryption(format!("AES-GCM encrypt: {e}")))?
            };
        }
        let ct = match self.key_size {
            16 => run!(aes_gcm::Aes128Gcm),
            24 => run!(aes_gcm::AesGcm::<aes::Aes192, U12>),
            _ => run!(aes_gcm::Aes256Gcm),
        };

        let mut out = nonce.to_vec();
        out.extend_from_slice(&ct);
        Ok(out)
    }

    fn gcm_decrypt(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        use aes_gcm::aead::{consts::U12, Aead};
        use aes_gcm::{KeyInit, Nonce};

        if data.len() < 12 + 16 {
            return Err(Error::DecryptionFailure("AES-GCM data too short".into()));
        }
        let (nonce, ct_and_tag) = data.split_at(12);
        let n = Nonce::from_slice(nonce);

        macro_rules! run {
            ($c:ty) => {
                <$c>::new_from_slice(key)
                    .map_err(|e| Error::Crypto(format!("AES-GCM init: {e}")))?
                    .decrypt(n, ct_and_tag)
                    .map_err(|_| {
                        Error::DecryptionFailure("AES-GCM authentication tag mismatch".into())
                    })
            };
        }
        match self.key_size {
            16 => run!(aes_gcm::Aes128Gcm),
            24 => run!(aes_gcm::AesGcm::<aes::Aes192, U12>),
            _ => run!(aes_gcm::Aes256Gcm),
        }
    }
}

fn pkcs7_pad(data: &[u8], block_size: usize) -> Vec<u8> {
    let pad_len = block_size - (data.len() % block_size);
    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);
    padded.resize(data.len() + pad_len, pad_len as u8);
    padded
}

/// Strip XML Encryption padding.
///
/// Only the last byte (the pad length) is checked, which accepts both
/// PKCS#7 and ISO 10126 filler.
fn xmlenc_unpad(data: &[u8], block_size: usize) -> Result<Vec<u8>> {
    let Some(&last) = data.last() else {
        return Ok(Vec::new());
    };
    let pad_len = last as usize;
    if pad_len == 0 || pad_len > block_size || pad_len > data.len() {
        return Err(Error::DecryptionFailure("invalid padding".into()));
    }
    Ok(data[..data.len() - pad_len].to_vec())
}
