//! Cycle detection over the derived-role dependency graph.
//!
//! An edge `d -> p` exists when derived role `d` names another **derived**
//! role `p` in its `parentRoles` (base roles are leaves, not nodes). The
//! graph must be acyclic; a three-color DFS finds the first cycle, if any.

use crate::policy::types::DerivedRoleDefinition;
use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

fn parent_edges<'a>(def: &'a DerivedRoleDefinition, names: &HashMap<&str, usize>) -> Vec<&'a str> {
    def.parent_roles
        .iter()
        .map(String::as_str)
        .filter(|p| names.contains_key(p))
        .collect()
}

/// Returns the first cycle found, as a path of derived-role names
/// (`a -> b -> a`-style, last element repeats the first), or `None` if the
/// graph is acyclic.
pub fn find_cycle(definitions: &[DerivedRoleDefinition]) -> Option<Vec<String>> {
    let names: HashMap<&str, usize> =
        definitions.iter().enumerate().map(|(i, d)| (d.name.as_str(), i)).collect();

    let mut color = vec![Color::White; definitions.len()];
    let mut stack: Vec<usize> = Vec::new();

    for start in 0..definitions.len() {
        if color[start] == Color::White {
            if let Some(cycle) = visit(start, &definitions, &names, &mut color, &mut stack) {
                return Some(cycle);
            }
        }
    }
    None
}

fn visit(
    node: usize,
    definitions: &[DerivedRoleDefinition],
    names: &HashMap<&str, usize>,
    color: &mut [Color],
    stack: &mut Vec<usize>,
) -> Option<Vec<String>> {
    color[node] = Color::Gray;
    stack.push(node);

    for parent in parent_edges(&definitions[node], names) {
        let next = names[parent];
        match color[next] {
            Color::White => {
                if let Some(cycle) = visit(next, definitions, names, color, stack) {
                    return Some(cycle);
                }
            }
            Color::Gray => {
                let start = stack.iter().position(|&n| n == next).unwrap_or(0);
                let mut cycle: Vec<String> = stack[start..].iter().map(|&n| definitions[n].name.clone()).collect();
                cycle.push(definitions[next].name.clone());
                return Some(cycle);
            }
            Color::Black => {}
        }
    }

    stack.pop();
    color[node] = Color::Black;
    None
}
