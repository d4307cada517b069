use std::ffi::CString;
use std::fs::File;
use std::io;
use std::os::fd::{FromRawFd, OwnedFd};

use memmap2::Mmap;

/// Something that can hand out a named read-only byte region.
///
/// [`PosixShm`] is the real one. Sessions only need the bytes and a
/// guarantee that dropping the region releases it.
pub trait RegionSource {
    type Region: AsRef<[u8]>;

    /// Attach to the region published under `name`.
    ///
    /// # Errors
    ///
    /// Any I/O error from opening or mapping the region.
    fn attach(&self, name: &str) -> io::Result<Self::Region>;
}

/// POSIX shared memory: `shm_open("/<name>")` mapped read-only.
#[derive(Clone, Copy, Debug, Default)]
pub struct PosixShm;

impl RegionSource for PosixShm {
    type Region = SharedRegion;

    fn attach(&self, name: &str) -> io::Result<SharedRegion> {
        SharedRegion::attach(name)
    }
}

/// A shared memory region mapped read-only for the length of one
/// session.
///
/// The mapping is released when the value drops, on every exit path.
/// [`release`](Self::release) just makes the point explicit in code that
/// must sequence work after it.
#[derive(Debug)]
pub struct SharedRegion {
    name: String,
    map: Mmap,
}

impl SharedRegion {
    /// Open `/<name>` read-only and map all of it.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `name` contains a NUL byte or a `/`.
    /// - The OS error from `shm_open`, `fstat` or `mmap`.
    pub fn attach(name: &str) -> io::Result<Self> {
        if name.contains('/') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "region name must not contain '/'",
            ));
        }
        let c_name = CString::new(format!("/{name}"))
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

        // SAFETY: `c_name` is a valid NUL-terminated string for the call.
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDONLY, 0) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: `fd` was just returned by shm_open and is owned by nobody
        // else; `OwnedFd` closes it once the mapping exists.
        let file = File::from(unsafe { OwnedFd::from_raw_fd(fd) });

        // SAFETY: the producer does not modify a published region while it
        // is loaded, and the session unloads it only after this mapping is
        // dropped. The mapping is never handed out mutably.
        let map = unsafe { Mmap::map(&file)? };

        tracing::info!(region = name, bytes = map.len(), "attached shared memory");
        Ok(Self {
            name: name.to_owned(),
            map,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Unmap now.
    pub fn release(self) {
        drop(self);
    }
}

impl AsRef<[u8]> for SharedRegion {
    fn as_ref(&self) -> &[u8] {
        &self.map
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        tracing::info!(region = %self.name, "released shared memory");
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use std::io::Write;

    use super::*;

    /// Create `/<name>` holding `bytes`; unlinked when dropped.
    struct Published(CString);

    impl Published {
        fn new(name: &str, bytes: &[u8]) -> Self {
            let c_name = CString::new(format!("/{name}")).unwrap();
            let fd = unsafe {
                libc::shm_open(
                    c_name.as_ptr(),
                    libc::O_CREAT | libc::O_RDWR | libc::O_TRUNC,
                    0o600,
                )
            };
            assert!(fd >= 0, "shm_open: {}", io::Error::last_os_error());
            let mut file = File::from(unsafe { OwnedFd::from_raw_fd(fd) });
            file.write_all(bytes).unwrap();
            Self(c_name)
        }
    }

    impl Drop for Published {
        fn drop(&mut self) {
            unsafe {
                libc::shm_unlink(self.0.as_ptr());
            }
        }
    }

    #[test]
    fn attach_maps_published_bytes() {
        let name = format!("wisent-test-{}", std::process::id());
        let _published = Published::new(&name, b"wisent bytes");
        let region = PosixShm.attach(&name).unwrap();
        assert_eq!(region.as_ref(), b"wisent bytes");
        assert_eq!(region.name(), name);
        region.release();
    }

    #[test]
    fn missing_region_is_not_found() {
        let err = SharedRegion::attach("wisent-test-does-not-exist").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn reject_nested_name() {
        let err = SharedRegion::attach("a/b").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
