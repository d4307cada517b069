use std::time::Instant;

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::remote::{ControlPlane, HttpControlPlane};
use crate::shm::{PosixShm, RegionSource};

/// One load, attach, decode, release, unload cycle.
///
/// ```text
///   control.load ──▶ regions.attach ──▶ decode(&bytes) ──▶ drop region ──▶ control.unload
///        │                 │                  │
///        └─ error: stop    └─ error ──────────┴──────────────▶ (release) ──▶ unload
/// ```
///
/// Once the load succeeded, unload is always sent, and always after the
/// local mapping is gone. The service is never asked to reclaim memory
/// this process still maps. A session can be run any number of times;
/// each run is a fresh cycle.
#[derive(Debug)]
pub struct Session<C = HttpControlPlane, S = PosixShm> {
    config: SessionConfig,
    control: C,
    regions: S,
}

impl Session {
    /// A session against the HTTP service and POSIX shared memory named
    /// in `config`.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidUrl`] for a bad `server_url`.
    pub fn connect(config: SessionConfig) -> Result<Self, SessionError> {
        let control = HttpControlPlane::new(&config.server_url)?;
        Ok(Self::new(config, control, PosixShm))
    }
}

impl<C: ControlPlane, S: RegionSource> Session<C, S> {
    pub fn new(config: SessionConfig, control: C, regions: S) -> Self {
        Self {
            config,
            control,
            regions,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn control(&self) -> &C {
        &self.control
    }

    /// Run `decode` over the dataset's bytes inside the session bracket.
    ///
    /// The bytes are only valid inside the closure. Return owned results.
    ///
    /// # Errors
    ///
    /// - The load error, if the load request fails (nothing else runs).
    /// - [`SessionError::Attach`] if the region cannot be mapped.
    /// - Whatever `decode` returns.
    /// - The unload error, if everything before it succeeded.
    ///
    /// When both the decode and the unload fail, the decode error is
    /// returned and the unload failure is logged.
    pub fn run<T, F>(&self, decode: F) -> Result<T, SessionError>
    where
        F: FnOnce(&[u8]) -> Result<T, SessionError>,
    {
        let name = self.config.dataset_name.as_str();
        let path = self.config.dataset_path();

        tracing::info!(dataset = name, path = %path.display(), "loading dataset");
        self.control.load(name, &path, self.config.load_csv)?;

        let outcome = self.attach_and_decode(decode);

        tracing::info!(dataset = name, "unloading dataset");
        match (outcome, self.control.unload(name)) {
            (Ok(value), Ok(_)) => Ok(value),
            (Ok(_), Err(err)) | (Err(err), Ok(_)) => Err(err),
            (Err(err), Err(unload)) => {
                tracing::warn!(dataset = name, error = %unload, "unload failed after decode error");
                Err(err)
            }
        }
    }

    fn attach_and_decode<T, F>(&self, decode: F) -> Result<T, SessionError>
    where
        F: FnOnce(&[u8]) -> Result<T, SessionError>,
    {
        let name = self.config.dataset_name.as_str();
        let region = self
            .regions
            .attach(name)
            .map_err(|source| SessionError::Attach {
                name: name.to_owned(),
                source,
            })?;

        let started = Instant::now();
        let result = decode(region.as_ref());
        tracing::info!(
            dataset = name,
            elapsed_us = started.elapsed().as_micros(),
            ok = result.is_ok(),
            "decode finished"
        );

        drop(region);
        result
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io;
    use std::path::Path;
    use std::rc::Rc;

    use wisent_decoder::{DecodeError, EagerDecoder};
    use wisent_fixtures::{BufferBuilder, longs};
    use wisent_types::Value;

    use super::*;

    type Log = Rc<RefCell<Vec<String>>>;

    struct FakeControl {
        log: Log,
        fail_load: bool,
        fail_unload: bool,
    }

    impl FakeControl {
        fn respond(&self, operation: &'static str, fail: bool) -> Result<String, SessionError> {
            if fail {
                return Err(SessionError::Remote {
                    operation,
                    status: 500,
                    body: "boom".into(),
                });
            }
            Ok("Done.".into())
        }
    }

    impl ControlPlane for FakeControl {
        fn load(&self, name: &str, path: &Path, load_csv: bool) -> Result<String, SessionError> {
            self.log
                .borrow_mut()
                .push(format!("load {name} {} {load_csv}", path.display()));
            self.respond("load", self.fail_load)
        }

        fn unload(&self, name: &str) -> Result<String, SessionError> {
            self.log.borrow_mut().push(format!("unload {name}"));
            self.respond("unload", self.fail_unload)
        }

        fn erase(&self, name: &str) -> Result<String, SessionError> {
            self.log.borrow_mut().push(format!("erase {name}"));
            self.respond("erase", false)
        }
    }

    struct FakeRegions {
        log: Log,
        bytes: Option<Vec<u8>>,
    }

    struct FakeRegion {
        log: Log,
        bytes: Vec<u8>,
    }

    impl AsRef<[u8]> for FakeRegion {
        fn as_ref(&self) -> &[u8] {
            &self.bytes
        }
    }

    impl Drop for FakeRegion {
        fn drop(&mut self) {
            self.log.borrow_mut().push("release".into());
        }
    }

    impl RegionSource for FakeRegions {
        type Region = FakeRegion;

        fn attach(&self, name: &str) -> io::Result<FakeRegion> {
            self.log.borrow_mut().push(format!("attach {name}"));
            match &self.bytes {
                Some(bytes) => Ok(FakeRegion {
                    log: Rc::clone(&self.log),
                    bytes: bytes.clone(),
                }),
                None => Err(io::Error::from(io::ErrorKind::NotFound)),
            }
        }
    }

    fn session(
        bytes: Option<Vec<u8>>,
        fail_load: bool,
        fail_unload: bool,
    ) -> (Session<FakeControl, FakeRegions>, Log) {
        let log = Log::default();
        let session = Session::new(
            SessionConfig {
                data_dir: "/data".into(),
                ..SessionConfig::default()
            },
            FakeControl {
                log: Rc::clone(&log),
                fail_load,
                fail_unload,
            },
            FakeRegions {
                log: Rc::clone(&log),
                bytes,
            },
        );
        (session, log)
    }

    fn decode_pushing(log: &Log) -> impl FnOnce(&[u8]) -> Result<Value, SessionError> + '_ {
        move |bytes| {
            log.borrow_mut().push("decode".into());
            Ok(EagerDecoder::decode(bytes)?)
        }
    }

    #[test]
    fn release_happens_before_unload() {
        let buf = BufferBuilder::new().build(&longs(&[1, 2]));
        let (session, log) = session(Some(buf), false, false);
        let value = session.run(decode_pushing(&log)).unwrap();
        assert_eq!(value, Value::List(vec![Value::Long(1), Value::Long(2)]));
        assert_eq!(
            *log.borrow(),
            [
                "load datapackage /data/datapackage.json true",
                "attach datapackage",
                "decode",
                "release",
                "unload datapackage",
            ]
        );
    }

    #[test]
    fn decode_failure_still_releases_and_unloads() {
        let (session, log) = session(Some(vec![0; 8]), false, false);
        let err = session.run(decode_pushing(&log)).unwrap_err();
        assert!(matches!(err, SessionError::Decode(DecodeError::Wire(_))));
        assert_eq!(log.borrow()[3..], ["release", "unload datapackage"]);
    }

    #[test]
    fn attach_failure_still_unloads() {
        let (session, log) = session(None, false, false);
        let err = session.run(decode_pushing(&log)).unwrap_err();
        assert!(matches!(err, SessionError::Attach { ref name, .. } if name == "datapackage"));
        assert_eq!(log.borrow().last().map(String::as_str), Some("unload datapackage"));
        assert!(!log.borrow().iter().any(|e| e == "decode"));
    }

    #[test]
    fn load_failure_stops_the_session() {
        let (session, log) = session(Some(vec![]), true, false);
        let err = session.run(decode_pushing(&log)).unwrap_err();
        assert!(matches!(err, SessionError::Remote { operation: "load", .. }));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn unload_failure_after_success_is_reported() {
        let buf = BufferBuilder::new().build(&longs(&[1]));
        let (session, log) = session(Some(buf), false, true);
        let err = session.run(decode_pushing(&log)).unwrap_err();
        assert!(matches!(err, SessionError::Remote { operation: "unload", .. }));
    }

    #[test]
    fn decode_error_wins_over_unload_error() {
        let (session, log) = session(Some(vec![1, 2, 3]), false, true);
        let err = session.run(decode_pushing(&log)).unwrap_err();
        assert!(matches!(err, SessionError::Decode(_)));
    }
}
