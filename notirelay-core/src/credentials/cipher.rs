use crate::error::EngineError;
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};

const KEY_LENGTH: usize = 32;
const IV_LENGTH: usize = 16;
const TAG_LENGTH: usize = 16;

/// AES-256-GCM with a 16-byte IV.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Symmetric encryption of stored secrets.
pub trait Cipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, EngineError>;
    fn decrypt(&self, ciphertext: &str) -> Result<String, EngineError>;
}

/// Produces and reads `hex(iv):hex(tag):hex(data)` strings.
pub struct AesGcmCipher {
    cipher: Aes256Gcm16,
}

impl AesGcmCipher {
    /// Builds a cipher from a 64-character hex key.
    pub fn from_hex_key(key: &str) -> Result<Self, EngineError> {
        let key = hex::decode(key.trim())
            .map_err(|err| EngineError::Configuration(format!("encryption key is not hex: {err}")))?;
        if key.len() != KEY_LENGTH {
            return Err(EngineError::Configuration(format!(
                "encryption key must be {KEY_LENGTH} bytes, got {}",
                key.len()
            )));
        }
        let cipher = Aes256Gcm16::new_from_slice(&key)
            .map_err(|err| EngineError::Configuration(err.to_string()))?;
        Ok(Self { cipher })
    }
}

impl Cipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, EngineError> {
        let iv = Aes256Gcm16::generate_nonce(&mut OsRng);
        let mut sealed = self
            .cipher
            .encrypt(&iv, plaintext.as_bytes())
            .map_err(|_| EngineError::Internal(anyhow::anyhow!("encryption failed")))?;
        let tag = sealed.split_off(sealed.len() - TAG_LENGTH);

        Ok(format!(
            "{}:{}:{}",
            hex::encode(iv),
            hex::encode(tag),
            hex::encode(sealed)
        ))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, EngineError> {
        let mut parts = ciphertext.split(':');
        let (Some(iv), Some(tag), Some(data), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(EngineError::Decryption(
                "expected iv:tag:data".to_string(),
            ));
        };

        let iv = decode_part(iv, "iv")?;
        let tag = decode_part(tag, "tag")?;
        let mut sealed = decode_part(data, "data")?;
        if iv.len() != IV_LENGTH || tag.len() != TAG_LENGTH {
            return Err(EngineError::Decryption(format!(
                "iv and tag must be {IV_LENGTH} bytes each"
            )));
        }
        sealed.extend_from_slice(&tag);

        let plaintext = self
            .cipher
            .decrypt(Nonce::<U16>::from_slice(&iv), sealed.as_slice())
            .map_err(|_| EngineError::Decryption("authentication failed".to_string()))?;
        String::from_utf8(plaintext)
            .map_err(|_| EngineError::Decryption("plaintext is not UTF-8".to_string()))
    }
}

fn decode_part(part: &str, name: &str) -> Result<Vec<u8>, EngineError> {
    hex::decode(part).map_err(|err| EngineError::Decryption(format!("{name} is not hex: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn test_seal_and_open() {
        let cipher = AesGcmCipher::from_hex_key(KEY).unwrap();
        let sealed = cipher.encrypt("secret_abc").unwrap();

        let parts: Vec<&str> = sealed.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), IV_LENGTH * 2);
        assert_eq!(parts[1].len(), TAG_LENGTH * 2);
        assert_eq!(cipher.decrypt(&sealed).unwrap(), "secret_abc");
    }

    #[test]
    fn test_fresh_iv_per_encryption() {
        let cipher = AesGcmCipher::from_hex_key(KEY).unwrap();
        assert_ne!(cipher.encrypt("x").unwrap(), cipher.encrypt("x").unwrap());
    }

    #[test]
    fn test_rejects_bad_keys() {
        assert!(matches!(
            AesGcmCipher::from_hex_key("abcd"),
            Err(EngineError::Configuration(_))
        ));
        assert!(matches!(
            AesGcmCipher::from_hex_key(&"zz".repeat(32)),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = AesGcmCipher::from_hex_key(KEY).unwrap().encrypt("t").unwrap();
        let other = AesGcmCipher::from_hex_key(&"ab".repeat(32)).unwrap();
        assert!(matches!(other.decrypt(&sealed), Err(EngineError::Decryption(_))));
    }

    #[test]
    fn test_tampering_fails() {
        let cipher = AesGcmCipher::from_hex_key(KEY).unwrap();
        let sealed = cipher.encrypt("token").unwrap();
        let (head, data) = sealed.rsplit_once(':').unwrap();
        let flipped = if data.starts_with('0') { "1" } else { "0" };
        let tampered = format!("{head}:{flipped}{}", &data[1..]);

        assert!(matches!(cipher.decrypt(&tampered), Err(EngineError::Decryption(_))));
    }

    #[test]
    fn test_malformed_input() {
        let cipher = AesGcmCipher::from_hex_key(KEY).unwrap();
        for input in ["", "abc", "aa:bb", "aa:bb:cc:dd", "zz:zz:zz", "00:00:00"] {
            assert!(
                matches!(cipher.decrypt(input), Err(EngineError::Decryption(_))),
                "{input}"
            );
        }
    }
}
