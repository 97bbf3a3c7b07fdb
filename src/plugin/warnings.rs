// Forwarding service warnings to the bundler

use super::PluginContext;
use crate::service::Message;
use std::path::Path;

/// Render one warning for the bundler's diagnostic channel
///
/// `[esbuild] (src/a.ts:3:7) text` with a location, `[esbuild] text`
/// without. The path is shown relative to `cwd` when possible.
pub fn format_warning(id: &str, cwd: &Path, warning: &Message) -> String {
    let mut message = String::from("[esbuild]");
    if let Some(location) = &warning.location {
        let id = Path::new(id);
        let shown = pathdiff::diff_paths(id, cwd).unwrap_or_else(|| id.to_path_buf());
        message.push_str(&format!(
            " ({}:{}:{})",
            shown.display(),
            location.line,
            location.column
        ));
    }
    message.push(' ');
    message.push_str(&warning.text);
    message
}

/// Send every warning to the bundler, in order
pub fn print_warnings(ctx: &dyn PluginContext, id: &str, cwd: &Path, warnings: &[Message]) {
    for warning in warnings {
        let message = format_warning(id, cwd, warning);
        tracing::warn!(id, "{}", message);
        ctx.warn(message);
    }
}
