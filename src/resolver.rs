//! Resolver adapter over the host's name resolution facility.
//!
//! Forward lookups go through `getaddrinfo` restricted to one address
//! family; reverse lookups go through `getnameinfo` with a required name,
//! decoded from punycode where glibc supports it.
//! Every failure is folded into [`ResolveError`]: "no such name" becomes
//! [`ResolveError::NotFound`], anything else [`ResolveError::Failed`].
//!
//! The calls block. The transport runs them on tokio's blocking pool.

use std::ffi::{CStr, CString};
use std::mem;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::ptr;

use thiserror::Error;

use crate::query::{RecordType, Resolution, ResolutionQuery};

/// glibc's "name has no address of the requested family".
#[cfg(all(target_os = "linux", target_env = "gnu"))]
const EAI_NODATA: libc::c_int = -5;

/// glibc's "decode IDN host names to the locale encoding".
#[cfg(all(target_os = "linux", target_env = "gnu"))]
const NI_IDN: libc::c_int = 32;

#[cfg(all(target_os = "linux", target_env = "gnu"))]
const NAMEINFO_FLAGS: libc::c_int = NI_IDN | libc::NI_NAMEREQD;

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
const NAMEINFO_FLAGS: libc::c_int = libc::NI_NAMEREQD;

const HOST_BUF_LEN: usize = 1025;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("name or address not found")]
    NotFound,

    #[error("resolver failure: {0}")]
    Failed(String),
}

/// Name resolution backend.
///
/// [`SystemResolver`] is the production implementation; tests plug in
/// fixed tables.
pub trait Resolve: Send + Sync + 'static {
    /// First IPv4 address of `name`.
    fn resolve_a(&self, name: &str) -> Result<Ipv4Addr, ResolveError>;

    /// First IPv6 address of `name`.
    fn resolve_aaaa(&self, name: &str) -> Result<Ipv6Addr, ResolveError>;

    /// Host name of a dotted-quad IPv4 `address`.
    fn resolve_ptr(&self, address: &str) -> Result<String, ResolveError>;

    /// Dispatch a query to the lookup matching its record type.
    fn resolve(&self, query: &ResolutionQuery) -> Result<Resolution, ResolveError> {
        let value = match query.record_type {
            RecordType::A => self.resolve_a(&query.target)?.to_string(),
            RecordType::Aaaa => self.resolve_aaaa(&query.target)?.to_string(),
            RecordType::Ptr => self.resolve_ptr(&query.target)?,
        };

        Ok(Resolution {
            query: query.clone(),
            value,
        })
    }
}

/// Resolver backed by the operating system (`getaddrinfo`/`getnameinfo`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl SystemResolver {
    pub fn new() -> Self {
        Self
    }
}

impl Resolve for SystemResolver {
    fn resolve_a(&self, name: &str) -> Result<Ipv4Addr, ResolveError> {
        let list = AddrInfoList::lookup(name, libc::AF_INET)?;

        list.iter()
            .find(|info| info.ai_family == libc::AF_INET && !info.ai_addr.is_null())
            .map(|info| {
                // SAFETY: ai_family is AF_INET so ai_addr points at a sockaddr_in.
                let addr = unsafe { &*(info.ai_addr as *const libc::sockaddr_in) };
                Ipv4Addr::from(u32::from_be(addr.sin_addr.s_addr))
            })
            .ok_or(ResolveError::NotFound)
    }

    fn resolve_aaaa(&self, name: &str) -> Result<Ipv6Addr, ResolveError> {
        let list = AddrInfoList::lookup(name, libc::AF_INET6)?;

        list.iter()
            .find(|info| info.ai_family == libc::AF_INET6 && !info.ai_addr.is_null())
            .map(|info| {
                // SAFETY: ai_family is AF_INET6 so ai_addr points at a sockaddr_in6.
                let addr = unsafe { &*(info.ai_addr as *const libc::sockaddr_in6) };
                Ipv6Addr::from(addr.sin6_addr.s6_addr)
            })
            .ok_or(ResolveError::NotFound)
    }

    fn resolve_ptr(&self, address: &str) -> Result<String, ResolveError> {
        let ip: Ipv4Addr = address.parse().map_err(|_| ResolveError::NotFound)?;

        // SAFETY: sockaddr_in is plain old data; all-zero is a valid value.
        let mut sa: libc::sockaddr_in = unsafe { mem::zeroed() };
        sa.sin_family = libc::AF_INET as libc::sa_family_t;
        sa.sin_addr = libc::in_addr {
            s_addr: u32::from(ip).to_be(),
        };

        let mut host = [0 as libc::c_char; HOST_BUF_LEN];
        // SAFETY: sa and host outlive the call and the lengths match.
        let ret = unsafe {
            libc::getnameinfo(
                &sa as *const libc::sockaddr_in as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
                host.as_mut_ptr(),
                HOST_BUF_LEN as libc::socklen_t,
                ptr::null_mut(),
                0,
                NAMEINFO_FLAGS,
            )
        };
        if ret != 0 {
            return Err(classify(ret));
        }

        // SAFETY: getnameinfo NUL-terminates host on success.
        let name = unsafe { CStr::from_ptr(host.as_ptr()) };
        Ok(name.to_string_lossy().into_owned())
    }
}

/// Owned `getaddrinfo` result list, freed on drop.
struct AddrInfoList {
    head: *mut libc::addrinfo,
}

impl AddrInfoList {
    fn lookup(name: &str, family: libc::c_int) -> Result<Self, ResolveError> {
        // A name with an interior NUL cannot exist.
        let node = CString::new(name).map_err(|_| ResolveError::NotFound)?;

        // SAFETY: addrinfo is plain old data; all-zero is a valid hints value.
        let mut hints: libc::addrinfo = unsafe { mem::zeroed() };
        hints.ai_family = family;
        hints.ai_socktype = libc::SOCK_DGRAM;

        let mut head = ptr::null_mut();
        // SAFETY: node and hints are valid for the call; head receives the list.
        let ret = unsafe { libc::getaddrinfo(node.as_ptr(), ptr::null(), &hints, &mut head) };
        if ret != 0 {
            return Err(classify(ret));
        }

        Ok(Self { head })
    }

    fn iter(&self) -> impl Iterator<Item = &libc::addrinfo> {
        // SAFETY: every node of the list lives until self is dropped.
        std::iter::successors(unsafe { self.head.as_ref() }, |info| unsafe {
            info.ai_next.as_ref()
        })
    }
}

impl Drop for AddrInfoList {
    fn drop(&mut self) {
        if !self.head.is_null() {
            // SAFETY: head came from a successful getaddrinfo and is freed once.
            unsafe { libc::freeaddrinfo(self.head) };
        }
    }
}

fn classify(code: libc::c_int) -> ResolveError {
    if is_no_name(code) {
        return ResolveError::NotFound;
    }

    // SAFETY: gai_strerror returns a static NUL-terminated string.
    let message = unsafe { CStr::from_ptr(libc::gai_strerror(code)) };
    ResolveError::Failed(message.to_string_lossy().into_owned())
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
fn is_no_name(code: libc::c_int) -> bool {
    code == libc::EAI_NONAME || code == EAI_NODATA
}

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
fn is_no_name(code: libc::c_int) -> bool {
    code == libc::EAI_NONAME
}
