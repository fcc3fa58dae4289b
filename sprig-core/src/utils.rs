//! Utility functions for the container

/// Naming convention utilities for bean names
pub mod naming {
    /// Converts a PascalCase class name to camelCase.
    ///
    /// Used as the default bean name when a definition source omits one,
    /// so `QqCoin` becomes `qqCoin`.
    ///
    /// ```
    /// use sprig_core::utils::naming::to_camel_case;
    ///
    /// assert_eq!(to_camel_case("Tencent"), "tencent");
    /// assert_eq!(to_camel_case("QqCoin"), "qqCoin");
    /// assert_eq!(to_camel_case(""), "");
    /// ```
    pub fn to_camel_case(s: &str) -> String {
        let mut chars = s.chars();
        match chars.next() {
            None => String::new(),
            Some(first) => {
                let mut result = String::with_capacity(s.len());
                result.extend(first.to_lowercase());
                result.push_str(chars.as_str());
                result
            }
        }
    }

    /// Splits a delimited name list such as `"a, b;c"` into names.
    pub fn split_names(s: &str, delimiters: &[char]) -> Vec<String> {
        s.split(|c: char| delimiters.contains(&c))
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Dependency resolution utilities
pub mod dependency {
    use std::collections::{HashMap, HashSet};
    use std::thread::{self, ThreadId};

    use parking_lot::Mutex;

    /// Tracks beans currently being created, per thread.
    ///
    /// Creation recurses on the calling thread, so a name that appears twice in
    /// the same thread's chain is a cycle that early exposure cannot break
    /// (constructor arguments, `depends-on`, prototypes). Other threads blocked
    /// on the singleton lock never show up in this thread's chain.
    #[derive(Debug, Default)]
    pub struct CreationTracker {
        creating: Mutex<HashMap<ThreadId, Vec<String>>>,
    }

    impl CreationTracker {
        pub fn new() -> Self {
            Self::default()
        }

        /// Checks if the current thread is creating `name`.
        pub fn is_creating(&self, name: &str) -> bool {
            self.creating
                .lock()
                .get(&thread::current().id())
                .map(|chain| chain.iter().any(|n| n == name))
                .unwrap_or(false)
        }

        /// Marks `name` as being created by the current thread.
        ///
        /// Returns `false` if the current thread is already creating it.
        pub fn start_creating(&self, name: &str) -> bool {
            let mut creating = self.creating.lock();
            let chain = creating.entry(thread::current().id()).or_default();
            if chain.iter().any(|n| n == name) {
                return false;
            }
            chain.push(name.to_string());
            true
        }

        /// Marks `name` as finished on the current thread.
        pub fn finish_creating(&self, name: &str) {
            let mut creating = self.creating.lock();
            let id = thread::current().id();
            if let Some(chain) = creating.get_mut(&id) {
                if let Some(pos) = chain.iter().rposition(|n| n == name) {
                    chain.remove(pos);
                }
                if chain.is_empty() {
                    creating.remove(&id);
                }
            }
        }

        /// The current thread's creation chain, outermost first.
        pub fn current_chain(&self) -> Vec<String> {
            self.creating
                .lock()
                .get(&thread::current().id())
                .cloned()
                .unwrap_or_default()
        }
    }

    /// Dependency graph analysis result
    #[derive(Debug)]
    pub enum DependencyValidationError {
        /// Circular dependency detected
        CircularDependency {
            /// The dependency chain forming the cycle
            cycle: Vec<String>,
        },
        /// Missing dependency detected
        MissingDependency {
            /// The bean that requires the dependency
            bean: String,
            /// The missing dependency
            missing: String,
        },
    }

    impl std::fmt::Display for DependencyValidationError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::CircularDependency { cycle } => {
                    write!(f, "circular depends-on chain: {}", cycle.join(" -> "))
                }
                Self::MissingDependency { bean, missing } => {
                    write!(f, "bean '{}' depends on '{}' which is not registered", bean, missing)
                }
            }
        }
    }

    /// Validates a `depends-on` graph for missing names and cycles.
    ///
    /// `order` fixes the traversal order so the reported problem is stable.
    pub fn validate_dependency_graph(
        order: &[String],
        dependencies: &HashMap<String, Vec<String>>,
    ) -> Result<(), DependencyValidationError> {
        for bean_name in order {
            for dep in dependencies.get(bean_name).into_iter().flatten() {
                if !dependencies.contains_key(dep) {
                    return Err(DependencyValidationError::MissingDependency {
                        bean: bean_name.clone(),
                        missing: dep.clone(),
                    });
                }
            }
        }

        let mut visited = HashSet::new();
        let mut stack = Vec::new();
        for bean_name in order {
            if !visited.contains(bean_name) {
                if let Some(cycle) = detect_cycle(bean_name, dependencies, &mut visited, &mut stack) {
                    return Err(DependencyValidationError::CircularDependency { cycle });
                }
            }
        }
        Ok(())
    }

    fn detect_cycle(
        node: &str,
        graph: &HashMap<String, Vec<String>>,
        visited: &mut HashSet<String>,
        stack: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        visited.insert(node.to_string());
        stack.push(node.to_string());

        for dep in graph.get(node).into_iter().flatten() {
            if let Some(start) = stack.iter().position(|n| n == dep) {
                let mut cycle = stack[start..].to_vec();
                cycle.push(dep.clone());
                return Some(cycle);
            }
            if !visited.contains(dep) {
                if let Some(cycle) = detect_cycle(dep, graph, visited, stack) {
                    return Some(cycle);
                }
            }
        }

        stack.pop();
        None
    }
}
