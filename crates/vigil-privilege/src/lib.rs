//! Discover and manage the privileges needed to open a raw `ICMP` socket.
//!
//! vigil sends and receives whole `ICMPv4` datagrams over an `AF_INET` /
//! `SOCK_RAW` socket, which always requires privileges on Unix.
//!
//! [`Privilege::acquire_privileges`]:
//!
//! - On Linux we check if `CAP_NET_RAW` is in the permitted set and if so raise it to the effective
//!   set
//! - On other Unix platforms this is a no-op
//!
//! [`Privilege::has_privileges`]:
//!
//! - On Linux we check if `CAP_NET_RAW` is in the effective set
//! - On other Unix platforms we check that the effective user is root
//!
//! [`Privilege::drop_privileges`]:
//!
//! - On Linux we clear the effective set
//! - On other Unix platforms this is a no-op
//!
//! # Examples
//!
//! Acquire the required privileges if we can and refuse to continue otherwise:
//!
//! ```rust,no_run
//! # fn main() -> anyhow::Result<()> {
//! # use vigil_privilege::Privilege;
//! let privilege = Privilege::acquire_privileges()?;
//! privilege.ensure()?;
//! // open the raw socket here
//! Privilege::drop_privileges()?;
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

/// A privilege error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A privilege error.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[cfg(target_os = "linux")]
    #[error("caps error: {0}")]
    CapsError(#[from] caps::errors::CapsError),
    #[error("{}", missing_privileges_message())]
    MissingPrivileges,
}

/// Run-time platform privilege information.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Privilege {
    has_privileges: bool,
}

impl Privilege {
    /// Discover information about the platform privileges.
    pub fn discover() -> Result<Self> {
        Ok(Self {
            has_privileges: Self::check_has_privileges()?,
        })
    }

    /// Create a new Privilege instance.
    #[must_use]
    pub const fn new(has_privileges: bool) -> Self {
        Self { has_privileges }
    }

    /// Are we running with the privileges required for raw sockets?
    #[must_use]
    pub const fn has_privileges(&self) -> bool {
        self.has_privileges
    }

    /// Fail with [`Error::MissingPrivileges`] unless raw sockets can be opened.
    pub fn ensure(&self) -> Result<()> {
        if self.has_privileges {
            Ok(())
        } else {
            Err(Error::MissingPrivileges)
        }
    }

    #[cfg(target_os = "linux")]
    /// Acquire privileges, if possible.
    ///
    /// Check if `CAP_NET_RAW` is in the permitted set and if so raise it to the effective set.
    pub fn acquire_privileges() -> Result<Self> {
        if caps::has_cap(None, caps::CapSet::Permitted, caps::Capability::CAP_NET_RAW)? {
            caps::raise(None, caps::CapSet::Effective, caps::Capability::CAP_NET_RAW)?;
        }
        Self::discover()
    }

    #[cfg(target_os = "linux")]
    fn check_has_privileges() -> Result<bool> {
        Ok(caps::has_cap(
            None,
            caps::CapSet::Effective,
            caps::Capability::CAP_NET_RAW,
        )?)
    }

    #[cfg(target_os = "linux")]
    /// Drop all privileges.
    ///
    /// Clears the effective set.
    pub fn drop_privileges() -> Result<()> {
        caps::clear(None, caps::CapSet::Effective)?;
        Ok(())
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    /// Acquire privileges, if possible.
    ///
    /// This is a no-op on non-Linux unix systems.
    pub fn acquire_privileges() -> Result<Self> {
        Self::discover()
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    #[allow(clippy::unnecessary_wraps)]
    fn check_has_privileges() -> Result<bool> {
        Ok(nix::unistd::Uid::effective().is_root())
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    /// Drop all privileges.
    ///
    /// This is a no-op on non-Linux unix systems.
    pub const fn drop_privileges() -> Result<()> {
        Ok(())
    }
}

#[cfg(target_os = "linux")]
const fn missing_privileges_message() -> &'static str {
    "privileges are required to open a raw ICMP socket: run as root or grant the binary \
     CAP_NET_RAW (sudo setcap cap_net_raw+p vigil)"
}

#[cfg(all(unix, not(target_os = "linux")))]
const fn missing_privileges_message() -> &'static str {
    "privileges are required to open a raw ICMP socket: run as root"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_with_privileges() -> anyhow::Result<()> {
        Privilege::new(true).ensure()?;
        Ok(())
    }

    #[test]
    fn test_ensure_without_privileges() {
        let err = Privilege::new(false).ensure().unwrap_err();
        assert!(matches!(err, Error::MissingPrivileges));
        assert!(err.to_string().contains("raw ICMP socket"));
    }

    #[test]
    fn test_discover() -> anyhow::Result<()> {
        let privilege = Privilege::discover()?;
        assert_eq!(privilege.has_privileges(), privilege.ensure().is_ok());
        Ok(())
    }
}
