//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] for the per-port discovery configuration.
//! Each port's config is a postcard blob under its own key (`port0`,
//! `port1`, ...) in the `rdm` namespace.
//!
//! - Config validation: every field is range-checked before persistence.
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`.
//! - Host builds keep blobs in memory (dev/test only).

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::DiscoveryConfig;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
const CONFIG_NAMESPACE: &str = "rdm";

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const MAX_BLOB_SIZE: usize = 256;

/// NUL-terminated NVS key, at most 15 characters.
type NvsKey = heapless::String<16>;

pub struct NvsAdapter {
    key: NvsKey,
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<NvsKey, Vec<u8>>>,
}

impl NvsAdapter {
    /// Open the store for port `port` and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised automatically.
    pub fn new(port: u8) -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
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
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            key: port_key(port)?,
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
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

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
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
    fn key_cstr(&self) -> [u8; 16] {
        let mut buf = [0u8; 16];
        buf[..self.key.len()].copy_from_slice(self.key.as_bytes());
        buf
    }

    /// Remove the stored config so the next load yields defaults.
    pub fn erase(&self) -> Result<(), ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store.borrow_mut().remove(&self.key);
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let key = self.key_cstr();
            Self::with_nvs_handle(true, |handle| {
                let ret = unsafe { nvs_erase_key(handle, key.as_ptr() as *const _) };
                if ret != ESP_OK && ret != ESP_ERR_NVS_NOT_FOUND {
                    return Err(ret);
                }
                match unsafe { nvs_commit(handle) } {
                    ESP_OK => Ok(()),
                    e => Err(e),
                }
            })
            .map_err(|_| ConfigError::IoError)
        }
    }
}

fn port_key(port: u8) -> Result<NvsKey, ConfigError> {
    use core::fmt::Write;
    let mut key = NvsKey::new();
    write!(key, "port{}", port).map_err(|_| ConfigError::IoError)?;
    Ok(key)
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<DiscoveryConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            if let Some(bytes) = self.store.borrow().get(&self.key) {
                let cfg: DiscoveryConfig =
                    postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: loaded {} from store", self.key);
                Ok(cfg)
            } else {
                info!("NvsAdapter: no stored {}, using defaults", self.key);
                Ok(DiscoveryConfig::default())
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let key = self.key_cstr();
            let result = Self::with_nvs_handle(false, |handle| {
                let mut buf = [0u8; MAX_BLOB_SIZE];
                let mut size = buf.len();
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok((buf, size))
            });

            match result {
                Ok((buf, size)) => {
                    let cfg: DiscoveryConfig =
                        postcard::from_bytes(&buf[..size]).map_err(|_| ConfigError::Corrupted)?;
                    info!("NvsAdapter: loaded {} from NVS ({} bytes)", self.key, size);
                    Ok(cfg)
                }
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => {
                    info!("NvsAdapter: no stored {}, using defaults", self.key);
                    Ok(DiscoveryConfig::default())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS read error {}, using defaults", e);
                    Ok(DiscoveryConfig::default())
                }
            }
        }
    }

    fn save(&self, config: &DiscoveryConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;

        #[cfg(not(target_os = "espidf"))]
        {
            self.store.borrow_mut().insert(self.key.clone(), bytes);
            info!("NvsAdapter: {} saved (simulation)", self.key);
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let key = self.key_cstr();
            let result = Self::with_nvs_handle(true, |handle| {
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key.as_ptr() as *const _,
                        bytes.as_ptr() as *const _,
                        bytes.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                match unsafe { nvs_commit(handle) } {
                    ESP_OK => Ok(()),
                    e => Err(e),
                }
            });
            match result {
                Ok(()) => {
                    info!("NvsAdapter: {} saved to NVS ({} bytes)", self.key, bytes.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS write error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}
