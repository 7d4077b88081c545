//! File access logging for generated HTTP and TCP filters

use envoy_types::pb::envoy::config::accesslog::v3::{
    access_log::ConfigType as AccessLogConfigType, AccessLog,
};
use envoy_types::pb::envoy::extensions::access_loggers::file::v3::FileAccessLog;

use crate::xds::filters::any_from_message;

pub const FILE_ACCESS_LOG_NAME: &str = "envoy.access_loggers.file";
pub const FILE_ACCESS_LOG_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.access_loggers.file.v3.FileAccessLog";

/// Access log writing Envoy's default format to `path`
pub fn file_access_log(path: &str) -> AccessLog {
    let file_log = FileAccessLog { path: path.to_string(), ..Default::default() };

    AccessLog {
        name: FILE_ACCESS_LOG_NAME.to_string(),
        filter: None,
        config_type: Some(AccessLogConfigType::TypedConfig(any_from_message(
            FILE_ACCESS_LOG_TYPE_URL,
            &file_log,
        ))),
    }
}
