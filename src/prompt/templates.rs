//! Built-in phase templates

use crate::orchestrator::PhaseKind;

pub const SYSTEM_TEMPLATE_NAME: &str = "system";
pub const USER_TEMPLATE_NAME: &str = "user";

/// System prompt shared by every phase; `tools` is only set for phases
/// that may issue commands
pub const SYSTEM_TEMPLATE: &str = r#"You are a reverse engineering assistant working in Ghidra through the GhidraMCP API.

{{instruction}}
{{#if tools}}

## Available commands
{{tools}}

To run a command, write it on its own line in exactly this form:
{{marker}} command_name(param1="value1", param2=123)

Examples:
{{marker}} list_functions()
{{marker}} decompile_function(name="main")
{{marker}} rename_function_by_address(address="1800011a8", new_name="parse_header")

Use only the commands listed above. Addresses are hexadecimal.
{{/if}}"#;

/// User prompt shared by every phase
pub const USER_TEMPLATE: &str = r#"{{#if memory}}## Memory
{{memory}}

{{/if}}## Request
{{query}}

## Iteration
{{iteration}} of {{max_iterations}}
{{#if history}}

## Progress so far
{{history}}
{{/if}}
{{#if current}}

## This iteration
{{current}}
{{/if}}

## Task
{{task}}
"#;

/// Standing instruction placed in the system prompt
pub fn instruction(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Planning => {
            "You plan the analysis. Work out which commands will answer the request and list them \
             in the order they should run. If earlier results already answer the request, say so \
             and list no commands."
        }
        PhaseKind::Execution => {
            "You turn a plan into commands. Output one command line per step, in order, and \
             nothing else. Correct any command that was rejected earlier."
        }
        PhaseKind::Analysis => {
            "You interpret command results. Answer the request in plain text as fully as the \
             results allow and say what is still unknown. Do not issue commands."
        }
        PhaseKind::Review => {
            "You review the analysis. Decide whether it fully answers the request. Explain \
             briefly, then end with a line containing only STOP if the request is answered or \
             CONTINUE if more work is needed."
        }
        PhaseKind::Verification => {
            "You verify the analysis against the raw command results. Point out any claim the \
             results do not support. End with a line containing only VERIFIED if every claim \
             holds or CONTINUE otherwise."
        }
        PhaseKind::Learning => {
            "You record what this session learned about the binary as short standalone facts: \
             function roles, renamed symbols, data structures. Do not issue commands."
        }
    }
}

/// Closing task line of the user prompt
pub fn task(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Planning => "Write the plan for this iteration.",
        PhaseKind::Execution => "Write the commands for the plan above.",
        PhaseKind::Analysis => "Analyze the results above and answer the request.",
        PhaseKind::Review => "Is the request answered? End with STOP or CONTINUE.",
        PhaseKind::Verification => "Are the claims supported? End with VERIFIED or CONTINUE.",
        PhaseKind::Learning => "List the facts worth remembering.",
    }
}

/// Whether the phase is shown the command catalogue
pub fn offers_tools(phase: PhaseKind) -> bool {
    matches!(phase, PhaseKind::Planning | PhaseKind::Execution)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_phase_has_text() {
        for phase in PhaseKind::ALL {
            assert!(!instruction(phase).is_empty());
            assert!(!task(phase).is_empty());
        }
    }

    #[test]
    fn test_review_asks_for_verdict() {
        assert!(instruction(PhaseKind::Review).contains("STOP"));
        assert!(task(PhaseKind::Review).contains("CONTINUE"));
    }

    #[test]
    fn test_only_command_phases_get_tools() {
        assert!(offers_tools(PhaseKind::Planning));
        assert!(offers_tools(PhaseKind::Execution));
        assert!(!offers_tools(PhaseKind::Analysis));
        assert!(!offers_tools(PhaseKind::Learning));
    }
}
