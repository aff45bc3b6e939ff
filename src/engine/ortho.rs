//! Orthogonal region management.
//!
//! Entering an orthogonal state creates a bare "ortho" application as a
//! child of the entering application. Each region instance then runs as an
//! application of its own: parent-thread regions are children of the ortho
//! application on this engine; separate-thread regions get a thread with a
//! fresh engine and mailbox. Exiting the state tears everything down again,
//! joining the region threads.

use super::app::{AppId, RegionInfo, RegionSet, RemoteRegion};
use super::context::Engine;
use super::error::EngineError;
use crate::core::{Event, EventId, RegionSpec, RunMode, StateGraph, StateId};
use crate::platform::ContextHandle;
use std::sync::{mpsc, Arc};
use std::thread;

impl Engine {
    pub(crate) fn enter_regions(
        &mut self,
        graph: &Arc<StateGraph>,
        app: AppId,
        state: StateId,
    ) -> Result<(), EngineError> {
        let ortho_name = format!("{}/{}", self.app_name(app), graph.name(state));
        let ortho = self.create_bare_app(&ortho_name);
        if let Some(record) = self.apps.get_mut(app) {
            record.regions.push(RegionSet {
                state,
                ortho,
                remote: Vec::new(),
            });
        }
        self.activate(ortho, Some(app))?;

        for region in graph.regions(state) {
            for index in 0..region.instances {
                let name = region.instance_name(index);
                let region_index = (region.instances > 1).then_some(index);
                match region.mode {
                    RunMode::ParentThread => {
                        let local = self.create_app(&name, region_index, graph, region.root);
                        if let Err(error) = self.activate(local, Some(ortho)) {
                            self.apps.remove(local);
                            return Err(error);
                        }
                    }
                    RunMode::SeparateThread => {
                        let remote = self.spawn_region(graph, region, name, region_index)?;
                        let set = self
                            .apps
                            .get_mut(app)
                            .and_then(|record| record.regions.iter_mut().find(|s| s.state == state));
                        if let Some(set) = set {
                            set.remote.push(remote);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn spawn_region(
        &self,
        graph: &Arc<StateGraph>,
        region: &RegionSpec,
        name: String,
        region_index: Option<usize>,
    ) -> Result<RemoteRegion, EngineError> {
        let config = self.config.clone();
        let platform = self.platform.clone();
        let graph = Arc::clone(graph);
        let root = region.root;
        let context = ContextHandle::new(config.mailbox_capacity);
        let inbox = context.clone();
        let app_name = name.clone();
        let (ready_tx, ready_rx) = mpsc::channel();

        if let Some(priority) = region.priority {
            tracing::debug!(region = %name, priority, "thread priority requested; running at default priority");
        }

        let worker = thread::Builder::new()
            .name(name.clone())
            .spawn(move || -> Result<(), EngineError> {
                let mut engine = Engine::with_handle(config, platform, inbox);
                let app = engine.create_app(&app_name, region_index, &graph, root);
                if let Err(error) = engine.activate(app, None) {
                    let _ = ready_tx.send(Err(error.to_string()));
                    return Err(error);
                }
                let _ = ready_tx.send(Ok(app));

                let outcome = engine.run();
                let stopped = engine.deactivate(app);
                engine.destroy_app(app);
                outcome?;
                stopped.map(|_| ())
            })
            .map_err(|source| EngineError::RegionSpawn {
                region: name.clone(),
                source,
            })?;

        match ready_rx.recv() {
            Ok(Ok(app)) => {
                tracing::debug!(region = %name, context = %context.id(), "region thread started");
                Ok(RemoteRegion {
                    name,
                    app,
                    context,
                    worker,
                })
            }
            Ok(Err(reason)) => {
                let _ = worker.join();
                Err(EngineError::RegionStart {
                    region: name,
                    reason,
                })
            }
            Err(_) => {
                let _ = worker.join();
                Err(EngineError::RegionStart {
                    region: name,
                    reason: "region thread ended before activation".to_string(),
                })
            }
        }
    }

    pub(crate) fn exit_regions(&mut self, app: AppId, state: StateId) -> Result<(), EngineError> {
        let Some(record) = self.apps.get_mut(app) else {
            return Ok(());
        };
        let Some(position) = record.regions.iter().position(|set| set.state == state) else {
            return Ok(());
        };
        let set = record.regions.remove(position);

        while let Some(local) = self.child_of(set.ortho) {
            self.retire(local)?;
            self.apps.remove(local);
        }

        let mut failure = None;
        let mut joinable = Vec::with_capacity(set.remote.len());
        for remote in set.remote {
            let stop = Event::int(EventId::EXIT_LOOP, 0, 0);
            match self.platform.poster.post(&remote.context, stop) {
                Ok(()) => joinable.push(remote),
                Err(source) => {
                    tracing::error!(region = %remote.name, %source, "could not stop region thread");
                    failure.get_or_insert(EngineError::Post {
                        region: remote.name,
                        source,
                    });
                }
            }
        }
        for remote in joinable {
            match remote.worker.join() {
                Ok(Ok(())) => tracing::debug!(region = %remote.name, "region thread joined"),
                Ok(Err(error)) => {
                    tracing::error!(region = %remote.name, %error, "region thread failed")
                }
                Err(_) => {
                    tracing::error!(region = %remote.name, "region thread panicked");
                    failure.get_or_insert(EngineError::RegionJoin {
                        region: remote.name,
                    });
                }
            }
        }

        self.retire(set.ortho)?;
        self.apps.remove(set.ortho);
        failure.map_or(Ok(()), Err)
    }

    /// Most recently activated application whose parent is `parent`.
    fn child_of(&self, parent: AppId) -> Option<AppId> {
        self.active
            .iter()
            .rev()
            .copied()
            .find(|&app| self.apps.get(app).map_or(false, |r| r.parent == Some(parent)))
    }

    /// Region applications started by the orthogonal states `app` is in,
    /// each with the context that runs it.
    pub fn regions(&self, app: AppId) -> Vec<RegionInfo> {
        let Some(record) = self.apps.get(app) else {
            return Vec::new();
        };
        let mut regions = Vec::new();
        for set in &record.regions {
            for &local in &self.active {
                if self.apps.get(local).and_then(|r| r.parent) == Some(set.ortho) {
                    regions.push(RegionInfo {
                        app: local,
                        context: self.handle.clone(),
                    });
                }
            }
            regions.extend(set.remote.iter().map(|remote| RegionInfo {
                app: remote.app,
                context: remote.context.clone(),
            }));
        }
        regions
    }
}
