use crate::core::domain::value_object::{ApiUrl, VirtHost, VirtPassword, VirtPort, VirtUsername};

/// Validated connection details of a dashboard backend.
#[derive(Debug, Clone)]
pub struct VirtConnection {
    host: VirtHost,
    port: VirtPort,
    username: VirtUsername,
    password: VirtPassword,
    secure: bool,
    accept_invalid_certs: bool,
    url: ApiUrl,
}

impl VirtConnection {
    pub fn new(
        host: VirtHost,
        port: VirtPort,
        username: VirtUsername,
        password: VirtPassword,
        secure: bool,
        accept_invalid_certs: bool,
        url: ApiUrl,
    ) -> Self {
        Self {
            host,
            port,
            username,
            password,
            secure,
            accept_invalid_certs,
            url,
        }
    }

    pub fn host(&self) -> &VirtHost {
        &self.host
    }

    pub fn port(&self) -> &VirtPort {
        &self.port
    }

    pub fn username(&self) -> &VirtUsername {
        &self.username
    }

    pub fn password(&self) -> &VirtPassword {
        &self.password
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn accepts_invalid_certs(&self) -> bool {
        self.accept_invalid_certs
    }

    pub fn url(&self) -> &ApiUrl {
        &self.url
    }
}
