use supacheck_core::builtin::{self, BuiltinOptions, BUILTIN_PLANS};

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::OutputArgs;

pub fn show_cmd(name: &str, opts: &BuiltinOptions, output: &OutputArgs) -> i32 {
    let Some(plan) = builtin::builtin(name, opts) else {
        print_error(
            output.format,
            output.quiet,
            &format!(
                "unknown built-in plan '{name}' (expected one of: {})",
                BUILTIN_PLANS.join(", ")
            ),
        );
        return exit_codes::VALIDATION_FAILED;
    };

    match output.format {
        OutputFormat::Json => print_result(output.format, output.quiet, &plan),
        OutputFormat::Text => match serde_yaml::to_string(&plan) {
            Ok(yaml) if !output.quiet => print!("{yaml}"),
            Ok(_) => {}
            Err(e) => {
                print_error(output.format, output.quiet, &format!("failed to encode plan: {e}"));
                return exit_codes::RUNTIME_ERROR;
            }
        },
    }
    exit_codes::SUCCESS
}
