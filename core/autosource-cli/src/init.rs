//! Shell bootstrap emitted by `autosource init`.
//!
//! The generated snippet is eval'd once from the user's shell rc. It
//! installs a prompt hook (zsh `precmd`, bash `PROMPT_COMMAND`) that evals
//! this binary's output before every prompt, and defines the `-as-source`
//! wrapper used by emitted activation scripts: security-check first, then
//! source with an ERR trap so a failing script reports and returns 1
//! instead of leaving a half-activated shell.

use autosource_core::{AutosourceError, Result, ENV_ACTIVE};

pub fn run() -> Result<i32> {
    let exe = std::env::current_exe()
        .and_then(|path| path.canonicalize())
        .map_err(|err| AutosourceError::io("resolve own executable path", err))?;
    print!("{}", render(&exe.to_string_lossy()));
    Ok(0)
}

pub(crate) fn render(arg0: &str) -> String {
    let eval_cmd = r#"eval -- "`autosource`""#;
    format!(
        r#"
export AUTOSOURCE_VERSION={version}
export AUTOSOURCE_PID=$$
-as-eval() {{ "$@"; }}
-as-source() {{
    {arg0} security-check "$1" || return 1
    # flag cleared by the ERR trap if anything below fails
    _as_ok=1 &&
    \trap 'unset _as_ok; return 0' ERR &&
    # -E persists the trap through function calls
    set -E &&
    # no && here: chaining would disable the ERR trap
    -as-eval source "$1"
    set +E &&
    \trap - ERR &&
    if ! [ "$_as_ok" ]; then
        \echo 'autosource: failed to source '"$1" >&2
        return 1
    fi
}}
alias autosource={arg0}
unset {varname}
if [ -n "$ZSH_VERSION" ]; then
    precmd_autosource() {{
        {cmd}
    }}
    precmd_functions=(precmd_autosource $precmd_functions)
else
    if ! ( \echo "$PROMPT_COMMAND" | \grep -Fq '{cmd}' ); then
        PROMPT_COMMAND='{cmd}; '"$PROMPT_COMMAND"
    fi
fi"#,
        version = env!("CARGO_PKG_VERSION"),
        arg0 = arg0,
        cmd = eval_cmd,
        varname = ENV_ACTIVE,
    )
}
