//! settings ノードのパース

use super::{children, invalid, number, positive_integer};
use crate::error::Result;
use crate::model::{RetrySettings, Settings};
use kdl::KdlNode;

/// settings ノードをパース
pub fn parse_settings(node: &KdlNode) -> Result<Settings> {
    let mut settings = Settings::default();

    for child in children(node) {
        match child.name().value() {
            "timeout_secs" | "timeout-secs" | "timeout" => {
                settings.timeout_secs = Some(positive_integer(child)?)
            }
            "retry" => settings.retry = parse_retry(child)?,
            other => tracing::warn!(node = other, "Unknown setting, ignoring"),
        }
    }

    Ok(settings)
}

fn parse_retry(node: &KdlNode) -> Result<RetrySettings> {
    let mut retry = RetrySettings::default();

    for child in children(node) {
        match child.name().value() {
            "max_attempts" | "max-attempts" => retry.max_attempts = Some(positive_integer(child)?),
            "initial_delay_ms" | "initial-delay-ms" => {
                retry.initial_delay_ms = Some(positive_integer(child)?)
            }
            "max_delay_ms" | "max-delay-ms" => retry.max_delay_ms = Some(positive_integer(child)?),
            "backoff_multiplier" | "backoff-multiplier" => {
                let multiplier = number(child)?;
                if !(1.0..=10.0).contains(&multiplier) {
                    return Err(invalid(child, "1.0 以上 10.0 以下で指定してください"));
                }
                retry.backoff_multiplier = Some(multiplier);
            }
            other => tracing::warn!(node = other, "Unknown retry setting, ignoring"),
        }
    }

    if let (Some(initial), Some(max)) = (retry.initial_delay_ms, retry.max_delay_ms)
        && initial > max
    {
        return Err(invalid(
            node,
            "initial-delay-ms は max-delay-ms 以下にしてください",
        ));
    }

    Ok(retry)
}
