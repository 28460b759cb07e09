//! Wi-Fi credential validation, ahead of any radio traffic

use airmx_proto::Command;

const MAX_SSID_LEN: usize = 32;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 63;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialsError {
    #[error("SSID must not be empty")]
    EmptySsid,
    #[error("SSID of {0} bytes exceeds the 32-byte limit")]
    SsidTooLong(usize),
    #[error("password of {0} bytes is outside the 8-63 byte WPA2 range")]
    PasswordLength(usize),
}

/// A validated SSID/password pair.
///
/// Validation happens here, once, so nothing past this point has to worry
/// about credentials the purifier could not encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    ssid: String,
    password: String,
}

impl WifiCredentials {
    pub fn new(
        ssid: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, CredentialsError> {
        let ssid = ssid.into();
        let password = password.into();

        if ssid.is_empty() {
            return Err(CredentialsError::EmptySsid);
        }
        if ssid.len() > MAX_SSID_LEN {
            return Err(CredentialsError::SsidTooLong(ssid.len()));
        }
        if password.len() < MIN_PASSWORD_LEN || password.len() > MAX_PASSWORD_LEN {
            return Err(CredentialsError::PasswordLength(password.len()));
        }

        Ok(Self { ssid, password })
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    /// Builds the configure-Wi-Fi command carrying these credentials.
    pub fn configure_command(&self) -> Command {
        Command::ConfigureWifi {
            ssid: self.ssid.clone(),
            password: self.password.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_credentials() {
        let credentials = WifiCredentials::new("Home", "password1").unwrap();
        assert_eq!(credentials.ssid(), "Home");
    }

    #[test]
    fn rejects_empty_ssid() {
        assert_eq!(
            WifiCredentials::new("", "password1"),
            Err(CredentialsError::EmptySsid)
        );
    }

    #[test]
    fn rejects_oversized_ssid() {
        let ssid = "x".repeat(33);
        assert_eq!(
            WifiCredentials::new(ssid, "password1"),
            Err(CredentialsError::SsidTooLong(33))
        );
        assert!(WifiCredentials::new("y".repeat(32), "password1").is_ok());
    }

    #[test]
    fn rejects_passwords_outside_wpa2_range() {
        assert_eq!(
            WifiCredentials::new("Home", "short"),
            Err(CredentialsError::PasswordLength(5))
        );
        assert_eq!(
            WifiCredentials::new("Home", "p".repeat(64)),
            Err(CredentialsError::PasswordLength(64))
        );
        assert!(WifiCredentials::new("Home", "p".repeat(8)).is_ok());
        assert!(WifiCredentials::new("Home", "p".repeat(63)).is_ok());
    }

    #[test]
    fn configure_command_carries_the_credentials() {
        let credentials = WifiCredentials::new("Home", "password1").unwrap();
        assert_eq!(
            credentials.configure_command(),
            Command::ConfigureWifi {
                ssid: "Home".to_string(),
                password: "password1".to_string(),
            }
        );
    }
}
