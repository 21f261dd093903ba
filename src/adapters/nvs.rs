//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] by storing the whole [`ControllerConfig`] as a
//! single `postcard` blob under `lightsync/ctrlcfg`.
//!
//! - Config validation: every save is range-checked first, and a loaded blob
//!   that no longer validates is reported instead of used.
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`.
//! - Host builds keep blobs in an in-memory map (dev/test only).

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::ControllerConfig;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
const CONFIG_NAMESPACE: &str = "lightsync";
const CONFIG_KEY: &str = "ctrlcfg";

/// Upper bound on the stored blob; topics and scene names dominate.
const MAX_BLOB_SIZE: usize = 2048;

pub struct NvsConfigStore {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsConfigStore {
    /// Open the store, initialising NVS flash if nothing has yet.
    ///
    /// On a full partition or after an NVS version change the partition is
    /// erased and re-initialised.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called from the main task before any concurrent NVS use.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsConfigStore: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsConfigStore: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    fn decode(bytes: &[u8]) -> Result<ControllerConfig, ConfigError> {
        let cfg: ControllerConfig =
            postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = CONFIG_NAMESPACE.as_bytes();
        ns_buf[..ns_bytes.len()].copy_from_slice(ns_bytes);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr().cast(), mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn key_cstr() -> [u8; 16] {
        let mut key_buf = [0u8; 16];
        let kb = CONFIG_KEY.as_bytes();
        key_buf[..kb.len()].copy_from_slice(kb);
        key_buf
    }

    /// Remove the stored config so the next load falls back to defaults.
    #[cfg(not(target_os = "espidf"))]
    pub fn erase(&self) -> Result<(), ConfigError> {
        self.store.borrow_mut().remove(CONFIG_KEY);
        Ok(())
    }

    /// Remove the stored config so the next load falls back to defaults.
    #[cfg(target_os = "espidf")]
    pub fn erase(&self) -> Result<(), ConfigError> {
        let key = Self::key_cstr();
        Self::with_nvs_handle(true, |handle| {
            let ret = unsafe { nvs_erase_key(handle, key.as_ptr().cast()) };
            if ret != ESP_OK && ret != ESP_ERR_NVS_NOT_FOUND {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        })
        .map_err(|e| {
            warn!("NvsConfigStore: erase failed ({})", e);
            ConfigError::IoError
        })
    }

    /// Overwrite the raw stored blob (host only, for exercising load paths).
    #[cfg(not(target_os = "espidf"))]
    pub fn put_raw(&self, bytes: &[u8]) {
        self.store
            .borrow_mut()
            .insert(CONFIG_KEY.to_owned(), bytes.to_vec());
    }
}

impl ConfigPort for NvsConfigStore {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            match self.store.borrow().get(CONFIG_KEY) {
                Some(bytes) => {
                    let cfg = Self::decode(bytes)?;
                    info!("NvsConfigStore: loaded config from store");
                    Ok(cfg)
                }
                None => {
                    info!("NvsConfigStore: no stored config, using defaults");
                    Ok(ControllerConfig::default())
                }
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let key = Self::key_cstr();
            let result = Self::with_nvs_handle(false, |handle| {
                let mut size: usize = 0;

                // First call: get size
                let ret = unsafe {
                    nvs_get_blob(handle, key.as_ptr().cast(), core::ptr::null_mut(), &mut size)
                };
                if ret == ESP_ERR_NVS_NOT_FOUND {
                    return Err(ESP_ERR_NVS_NOT_FOUND);
                }
                if ret != ESP_OK || size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ret);
                }

                let mut buf = vec![0u8; size];
                let ret = unsafe {
                    nvs_get_blob(handle, key.as_ptr().cast(), buf.as_mut_ptr().cast(), &mut size)
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(buf)
            });

            match result {
                Ok(bytes) => {
                    let cfg = Self::decode(&bytes)?;
                    info!("NvsConfigStore: loaded config from NVS ({} bytes)", bytes.len());
                    Ok(cfg)
                }
                // Namespace missing on first boot also lands here.
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => {
                    info!("NvsConfigStore: no stored config, using defaults");
                    Ok(ControllerConfig::default())
                }
                Err(e) => {
                    warn!("NvsConfigStore: NVS read error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }

    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::ValidationFailed(
                "config too large for NVS blob",
            ));
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .insert(CONFIG_KEY.to_owned(), bytes);
            info!("NvsConfigStore: config saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let key = Self::key_cstr();
            let result = Self::with_nvs_handle(true, |handle| {
                let ret = unsafe {
                    nvs_set_blob(handle, key.as_ptr().cast(), bytes.as_ptr().cast(), bytes.len())
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NvsConfigStore: config saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("NvsConfigStore: NVS write error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}
