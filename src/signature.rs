/// Computes the authentication tag (`mac`) over a serialized batch.
///
/// Any `Fn(&str, &[u8]) -> String` closure is a signer, so hosts can plug in
/// whatever primitive their backend verifies. [`HmacSha256`] is provided.
pub trait Signer: Send + Sync + 'static {
    fn sign(&self, secret: &str, data: &[u8]) -> String;
}

impl<F> Signer for F
where
    F: Fn(&str, &[u8]) -> String + Send + Sync + 'static,
{
    fn sign(&self, secret: &str, data: &[u8]) -> String {
        self(secret, data)
    }
}

#[cfg(feature = "hmac")]
pub use hmac_sha256::HmacSha256;

#[cfg(feature = "hmac")]
mod hmac_sha256 {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    use super::Signer;

    type Mac256 = Hmac<Sha256>;

    /// HMAC-SHA256 signer producing lowercase hex tags.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct HmacSha256;

    impl HmacSha256 {
        /// Check `tag` against the expected tag for `data` in constant time.
        pub fn verify(&self, secret: &str, data: &[u8], tag: &str) -> bool {
            let Ok(expected) = hex::decode(tag) else {
                return false;
            };
            match Mac256::new_from_slice(secret.as_bytes()) {
                Ok(mut mac) => {
                    mac.update(data);
                    mac.verify_slice(&expected).is_ok()
                }
                Err(_) => false,
            }
        }
    }

    impl Signer for HmacSha256 {
        fn sign(&self, secret: &str, data: &[u8]) -> String {
            let mut mac = Mac256::new_from_slice(secret.as_bytes())
                .expect("HMAC can take key of any size");
            mac.update(data);
            hex::encode(mac.finalize().into_bytes())
        }
    }
}
