//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Lookout Signaling Relay Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[relay]
# host = "0.0.0.0"
# port = 3000
# mode = "fan-out"          # fan-out, shared-offer
# channel_capacity = 256    # 16-65536
# handshake_timeout = 10    # seconds, 1-120

[webhook]
# enabled = true
# host = "0.0.0.0"
# port = 3001
# frame_timeout = 5         # seconds, 1-60
# allowed_origins = ["http://localhost:5173"]   # empty = any origin

[logging]
# level = "INFO"            # DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}
