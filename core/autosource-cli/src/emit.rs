//! Per-prompt emission: resolve trust, plan the transition, print commands.
//!
//! Ambient process state (the working directory, the environment, stdin)
//! is read here, once, and handed to the core as values; the core never
//! peeks at it directly.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use autosource_core::{
    activation, plan, security, AutosourceError, DecisionStore, FsMarkerLookup, Result,
    StdinInput, TrustResolver, ENV_ACTIVE,
};

/// The inherited environment as a string map.
///
/// Non-UTF-8 entries are skipped; they cannot round-trip through the
/// emitted shell text anyway.
fn current_env() -> BTreeMap<String, String> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

/// The default one-shot: called before every prompt by the installed hook.
pub fn run() -> Result<i32> {
    // A deleted working directory means there is nothing to activate; stay
    // silent so the prompt is not disrupted.
    let cwd = match std::env::current_dir().and_then(|path| path.canonicalize()) {
        Ok(cwd) => cwd,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(AutosourceError::io("resolve current directory", err)),
    };

    let env = current_env();
    let output = compute_output(&env, &cwd)?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(0)
}

fn compute_output(env: &BTreeMap<String, String>, cwd: &Path) -> Result<String> {
    let mut store = DecisionStore::open(&DecisionStore::default_dir()?)?;
    let markers = FsMarkerLookup;
    let mut input = StdinInput;
    let mut stderr = std::io::stderr();

    let target = {
        let mut resolver = TrustResolver::new(&mut store, &markers, &mut input, &mut stderr);
        resolver.find_allowed(cwd)?
    };

    // The active path lives in shell state; read it once, here.
    let previous = env
        .get(ENV_ACTIVE)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from);

    let transition = plan(previous.as_deref(), target.as_deref());
    tracing::debug!(
        previous = ?previous,
        target = ?target,
        deactivate = transition.deactivate,
        activate = transition.activate,
        "Planned transition"
    );

    let mut parts = Vec::new();
    let mut env_for_activation = env.clone();

    if transition.deactivate {
        if let Some(deactivation) = activation::deactivate_commands(env)? {
            parts.push(deactivation.commands);
            env_for_activation = deactivation.resulting_env;
        }
    }
    if transition.activate {
        if let Some(project) = &target {
            parts.push(activation::activate_commands(
                &env_for_activation,
                project,
                cwd,
            )?);
        }
    }

    Ok(parts.join(" &&\n"))
}

/// `autosource deactivate`: used by the emitted rollback line, and handy
/// for users who want out manually.
pub fn run_deactivate() -> Result<i32> {
    let env = current_env();
    if let Some(deactivation) = activation::deactivate_commands(&env)? {
        println!("{}", deactivation.commands);
    }
    Ok(0)
}

/// `autosource security-check <path>`: advisory refusal with exit status.
pub fn run_security_check(path: &Path) -> Result<i32> {
    match security::security_check(path)? {
        Some(message) => {
            eprintln!("{message}");
            Ok(1)
        }
        None => Ok(0),
    }
}
