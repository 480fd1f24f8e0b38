use crate::error::RingError;

/// Opaque identifier for a registered handler, used to express dependencies
/// between consumers at wiring time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(pub(crate) usize);

impl HandlerId {
    pub(crate) fn index(&self) -> usize {
        self.0
    }
}

/// The directed dependency graph of registered handlers.
///
/// An edge `a -> b` means handler `a` runs behind handler `b` (a's barrier
/// is gated on b's consumed sequence). The graph is built during
/// registration and checked for cycles once, before any processor thread is
/// spawned.
#[derive(Debug, Default)]
pub(crate) struct DependencyGraph {
    /// Per node: indices of the nodes it depends on.
    depends_on: Vec<Vec<usize>>,
}

impl DependencyGraph {
    pub(crate) fn add_node(&mut self) -> HandlerId {
        self.depends_on.push(Vec::new());
        HandlerId(self.depends_on.len() - 1)
    }

    pub(crate) fn len(&self) -> usize {
        self.depends_on.len()
    }

    pub(crate) fn dependencies_of(&self, id: HandlerId) -> &[usize] {
        &self.depends_on[id.index()]
    }

    /// Records that `handler` must run behind `upstream`.
    pub(crate) fn add_dependency(
        &mut self,
        handler: HandlerId,
        upstream: HandlerId,
    ) -> Result<(), RingError> {
        if handler.index() >= self.depends_on.len() {
            return Err(RingError::UnknownHandler(handler));
        }
        if upstream.index() >= self.depends_on.len() {
            return Err(RingError::UnknownHandler(upstream));
        }
        let deps = &mut self.depends_on[handler.index()];
        if !deps.contains(&upstream.index()) {
            deps.push(upstream.index());
        }
        Ok(())
    }

    /// Kahn's algorithm. `Ok` when every node can be ordered, `Err` when a
    /// cycle remains.
    pub(crate) fn check_acyclic(&self) -> Result<(), RingError> {
        let n = self.depends_on.len();

        // in_degree counts unresolved dependencies per node.
        let mut in_degree: Vec<usize> = self.depends_on.iter().map(|d| d.len()).collect();
        // dependents[u] lists the nodes waiting on u.
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (node, deps) in self.depends_on.iter().enumerate() {
            for &dep in deps {
                dependents[dep].push(node);
            }
        }

        let mut queue: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut ordered = 0;

        while let Some(node) = queue.pop() {
            ordered += 1;
            for &waiting in &dependents[node] {
                in_degree[waiting] -= 1;
                if in_degree[waiting] == 0 {
                    queue.push(waiting);
                }
            }
        }

        if ordered == n {
            Ok(())
        } else {
            Err(RingError::DependencyCycle)
        }
    }
}
