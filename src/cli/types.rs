// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! Types command - list component types

use colored::Colorize;
use miette::Result;

use crate::component::TypeTable;

/// Run the types command
pub async fn run(_verbose: bool) -> Result<()> {
    let table = TypeTable::with_builtins();

    println!("{}", "Component types".bold());
    println!("{}", "═".repeat(40));

    for (kind, entry) in table.iter() {
        let role = if entry.is_operator() { "operator" } else { "component" };
        println!("  {:<16} {:<10} {}", kind.cyan(), role, entry.description.dimmed());
    }

    Ok(())
}
