use std::env;

use evermore_common::SheetUrl;
use tracing::info;

pub struct Config {
    pub sheet_url: SheetUrl,
    pub guest_name: String,
}

impl Config {
    /// Endpoint and greeting come from the environment. The guest name can
    /// also ride the command line, the way the original invitation took it
    /// from its `?to=` query parameter.
    pub fn load() -> Self {
        let guest_name = env::args()
            .nth(1)
            .unwrap_or_else(|| var_or("EVERMORE_GUEST", "Guest"));
        Self {
            sheet_url: SheetUrl(var_or("EVERMORE_SHEET_URL", "http://127.0.0.1:8000/")),
            guest_name,
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}
