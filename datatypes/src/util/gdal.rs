use gdal::errors::GdalError;
use gdal::{Dataset, DatasetOptions};
use snafu::ResultExt;
use std::ffi::{c_char, CStr};
use std::path::Path;

use crate::error;
use crate::util::Result;

pub fn hide_gdal_errors() {
    gdal::config::set_error_handler(|_, _, _| {});
}

/// Opens a Gdal Dataset with the given `path` and verbose errors, so failures carry GDAL's message.
/// Other crates should use this method for Gdal Dataset access.
pub fn gdal_open_dataset(path: &Path) -> Result<Dataset> {
    let dataset_options = DatasetOptions {
        open_flags: gdal::GdalOpenFlags::GDAL_OF_RASTER | gdal::GdalOpenFlags::GDAL_OF_VERBOSE_ERROR,
        ..DatasetOptions::default()
    };

    Dataset::open_ex(path, dataset_options).context(error::Gdal)
}

/// Turns GDAL's last error message into a `GdalError` for a failed call to `method_name` and resets the error state.
pub fn last_gdal_error(method_name: &'static str) -> GdalError {
    let msg = unsafe {
        let msg = c_string(gdal_sys::CPLGetLastErrorMsg());
        gdal_sys::CPLErrorReset();
        msg
    };

    GdalError::NullPointer { method_name, msg }
}

unsafe fn c_string(raw_ptr: *const c_char) -> String {
    if raw_ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(raw_ptr).to_string_lossy().into_owned()
}
