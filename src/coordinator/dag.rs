//! Kahn's algorithm over each role's `depends_on` list: produces an
//! execution order grouped into levels (maximal antichains) so same-level
//! roles can be dispatched concurrently while respecting dependencies.

use std::collections::{HashMap, VecDeque};

use crate::error::{CouncilError, CouncilResult};
use crate::role::Registry;

/// Group role names into levels: level 0 has no dependencies, level k
/// depends only on roles in levels < k.
pub fn topological_levels(registry: &Registry) -> CouncilResult<Vec<Vec<String>>> {
    let names: Vec<String> = registry.list_names().to_vec();
    let mut in_degree: HashMap<String, usize> = names.iter().map(|n| (n.clone(), 0)).collect();
    let mut dependents: HashMap<String, Vec<String>> = names.iter().map(|n| (n.clone(), Vec::new())).collect();

    for name in &names {
        let role = registry.get(name)?;
        for dep in &role.depends_on {
            *in_degree.get_mut(name).unwrap() += 1;
            dependents.get_mut(dep).unwrap().push(name.clone());
        }
    }

    let mut levels = Vec::new();
    let mut frontier: VecDeque<String> = names
        .iter()
        .filter(|n| in_degree[n.as_str()] == 0)
        .cloned()
        .collect();
    let mut visited = 0usize;

    while !frontier.is_empty() {
        let level: Vec<String> = frontier.drain(..).collect();
        visited += level.len();
        let mut next_frontier = Vec::new();
        for name in &level {
            for dependent in &dependents[name] {
                let degree = in_degree.get_mut(dependent).unwrap();
                *degree -= 1;
                if *degree == 0 {
                    next_frontier.push(dependent.clone());
                }
            }
        }
        levels.push(level);
        frontier = next_frontier.into();
    }

    if visited != names.len() {
        return Err(CouncilError::configuration(
            "role dependency graph contains a cycle",
        ));
    }

    Ok(levels)
}
