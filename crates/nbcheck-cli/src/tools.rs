//! Tools command: check the external programs a run depends on.

use nbcheck_core::{RenderFormat, is_available};

use crate::colors;
use crate::settings::Settings;

/// Report each external program, failing if one the configuration needs is
/// missing.
pub fn execute(settings: &Settings) -> anyhow::Result<()> {
    let config = settings.load(&[])?;
    let tools = &config.tools;

    let checks = [
        (tools.pytest.as_str(), "executor (pytest + nbmake)", true),
        (
            tools.jupyter.as_str(),
            "renderer (nbconvert)",
            config.render_format != RenderFormat::None,
        ),
        (
            tools.tectonic.as_str(),
            "PDF compiler",
            config.render_format == RenderFormat::Pdf,
        ),
    ];

    let mut missing = Vec::new();
    for (program, role, required) in checks {
        if is_available(program) {
            println!("{}✓{} {:<12} {}", colors::GREEN, colors::RESET, program, role);
        } else if required {
            println!("{}✗{} {:<12} {} (not found)", colors::RED, colors::RESET, program, role);
            missing.push(program);
        } else {
            println!(
                "{}- {:<12} {} (not found, not needed){}",
                colors::DIM,
                program,
                role,
                colors::RESET
            );
        }
    }

    if !missing.is_empty() {
        anyhow::bail!("missing required programs: {}", missing.join(", "));
    }
    Ok(())
}
