//! Composite octree volume and the parallel march scheduler
//!
//! A march runs in three steps. The owning thread marks the octree and
//! pushes every node to polygonize onto a shared stack. One job per pool
//! thread then pops nodes until the stack is empty, writing triangles into
//! the consumer picked by its job index. Finally every consumer is sealed,
//! either directly (`march`) or from the main-thread queue (`march_async`).
//!
//! Each march takes a new generation number. Consumers remember the
//! generation that last reset them, so work from a superseded march can
//! never leak into the output of a newer one.

use crate::marching_cubes::{MarchingCubes, MarchingCubesConfig};
use crate::octree::{Octree, OctreeNode};
use crate::parallel::{JobHandle, MainThreadQueue, ThreadPool};
use isocrate_core::{Aabbi, Error, MaterialState, Point3f, Result, Triangle, TriangleConsumer};
use isocrate_samplers::{Mode, VolumeSampler};
use log::{debug, error, trace};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Volume configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Side length of the cubic lattice domain
    pub size: i32,
    /// Octree nodes stop subdividing at this side length
    pub min_node_size: i32,
    /// Width of the soft shell inside every sampler's boundary
    pub fuzziness: f32,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            size: 64,
            min_node_size: 4,
            fuzziness: 1.0,
        }
    }
}

impl VolumeConfig {
    pub fn new(size: i32, min_node_size: i32) -> Self {
        Self {
            size,
            min_node_size,
            ..Default::default()
        }
    }

    pub fn with_fuzziness(mut self, fuzziness: f32) -> Self {
        self.fuzziness = fuzziness;
        self
    }

    /// Check the configuration describes a buildable volume
    pub fn validate(&self) -> Result<()> {
        if self.size <= 0 || self.min_node_size <= 0 {
            return Err(Error::InvalidConfiguration(format!(
                "volume and node sizes must be positive, got {} and {}",
                self.size, self.min_node_size
            )));
        }
        if self.min_node_size >= self.size {
            return Err(Error::InvalidConfiguration(format!(
                "minimum node size {} must be smaller than the volume size {}",
                self.min_node_size, self.size
            )));
        }
        if !(self.size as u32).is_power_of_two() {
            return Err(Error::InvalidConfiguration(format!(
                "volume size must be a power of two, got {}",
                self.size
            )));
        }
        if !self.fuzziness.is_finite() || self.fuzziness < 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "fuzziness must be a non-negative number, got {}",
                self.fuzziness
            )));
        }
        Ok(())
    }
}

/// Identity of an octree node handed to observers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeInfo {
    pub id: usize,
    pub bounds: Aabbi,
    pub depth: usize,
    pub child_index: usize,
}

impl NodeInfo {
    fn new(id: usize, node: &OctreeNode) -> Self {
        Self {
            id,
            bounds: node.bounds,
            depth: node.depth,
            child_index: node.child_index,
        }
    }
}

/// Hooks into a march, called from the owning thread and from workers
pub trait MarchObserver: Send + Sync {
    /// The nodes selected for polygonization
    fn did_collect(&self, _nodes: &[NodeInfo]) {}

    /// A node finished on the job with index `job_index`
    fn did_march_node(&self, _node: &NodeInfo, _job_index: usize, _triangles: usize) {}
}

/// Summary of a finished march
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MarchStats {
    pub generation: u64,
    pub nodes_marched: usize,
    pub jobs: usize,
    pub triangles: usize,
}

/// Typed key for a sampler owned by a volume
pub struct SamplerHandle<S> {
    id: u64,
    _marker: PhantomData<fn() -> S>,
}

impl<S> SamplerHandle<S> {
    fn new(id: u64) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<S> Clone for SamplerHandle<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for SamplerHandle<S> {}

impl<S> PartialEq for SamplerHandle<S> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<S> Eq for SamplerHandle<S> {}

impl<S> fmt::Debug for SamplerHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SamplerHandle").field(&self.id).finish()
    }
}

struct ConsumerSlot<C> {
    consumer: C,
    /// Generation that last reset this consumer
    generation: u64,
}

/// The per-job triangle consumers of a volume
pub struct ConsumerSet<C> {
    slots: Vec<Mutex<ConsumerSlot<C>>>,
}

impl<C> fmt::Debug for ConsumerSet<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerSet").field("len", &self.slots.len()).finish()
    }
}

impl<C: TriangleConsumer> ConsumerSet<C> {
    fn new(consumers: Vec<C>) -> Self {
        let slots = consumers
            .into_iter()
            .map(|consumer| {
                Mutex::new(ConsumerSlot {
                    consumer,
                    generation: 0,
                })
            })
            .collect();
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Inspect consumer `index`
    pub fn with<R>(&self, index: usize, f: impl FnOnce(&C) -> R) -> Option<R> {
        self.slots.get(index).map(|_| f(&self.lock(index).consumer))
    }

    /// Modify consumer `index`, e.g. to patch sealed vertices
    pub fn with_mut<R>(&self, index: usize, f: impl FnOnce(&mut C) -> R) -> Option<R> {
        self.slots.get(index).map(|_| f(&mut self.lock(index).consumer))
    }

    /// Triangles held across all consumers
    pub fn triangle_count(&self) -> usize {
        (0..self.len()).map(|i| self.lock(i).consumer.triangle_count()).sum()
    }

    fn lock(&self, index: usize) -> MutexGuard<'_, ConsumerSlot<C>> {
        self.slots[index].lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock consumer `index` for `generation`, resetting it on first use
    ///
    /// Returns `None` once a newer generation owns the consumer.
    fn claim(&self, index: usize, generation: u64) -> Option<MutexGuard<'_, ConsumerSlot<C>>> {
        let mut slot = self.lock(index);
        if slot.generation > generation {
            return None;
        }
        if slot.generation < generation {
            slot.consumer.start();
            slot.generation = generation;
        }
        Some(slot)
    }

    /// Seal every consumer for `generation`
    fn finalize(&self, generation: u64) -> bool {
        for index in 0..self.slots.len() {
            let Some(mut slot) = self.claim(index, generation) else {
                return false;
            };
            slot.consumer.finish();
        }
        true
    }
}

struct Shared<C> {
    generation: AtomicU64,
    consumers: ConsumerSet<C>,
}

impl<C> Shared<C> {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}

struct NodeJob {
    info: NodeInfo,
    additive: Vec<usize>,
    subtractive: Vec<usize>,
}

/// Everything a march's jobs read, frozen when the march starts
struct MarchPlan {
    generation: u64,
    samplers: Vec<Arc<dyn VolumeSampler>>,
    fuzziness: f32,
    marching_cubes: MarchingCubes,
    observer: Option<Arc<dyn MarchObserver>>,
    node_count: usize,
    pending: Mutex<Vec<NodeJob>>,
}

impl MarchPlan {
    fn next_node(&self) -> Option<NodeJob> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).pop()
    }

    fn march_node<C: TriangleConsumer + ?Sized>(&self, node: &NodeJob, consumer: &mut C) -> usize {
        let samplers = &self.samplers;
        let sampler = |p: &Point3f| {
            sample_field(samplers, &node.additive, &node.subtractive, p, self.fuzziness)
        };
        let field: &dyn Fn(&Point3f) -> f32 =
            &|p: &Point3f| field_value(samplers, &node.additive, &node.subtractive, p, self.fuzziness);
        self.marching_cubes.march(&node.info.bounds, sampler, Some(field), consumer)
    }
}

/// Remove subtractive occupancy from an additive total in [0,1]
fn carve(
    samplers: &[Arc<dyn VolumeSampler>],
    subtractive: &[usize],
    point: &Point3f,
    fuzziness: f32,
    mut value: f32,
) -> f32 {
    for &id in subtractive {
        if value <= 0.0 {
            break;
        }
        value -= samplers[id].value_at(point, fuzziness);
    }
    value.clamp(0.0, 1.0)
}

/// Field value and blended material at `point`
fn sample_field(
    samplers: &[Arc<dyn VolumeSampler>],
    additive: &[usize],
    subtractive: &[usize],
    point: &Point3f,
    fuzziness: f32,
) -> (f32, MaterialState) {
    let mut value = 0.0;
    let mut material: Option<MaterialState> = None;
    for &id in additive {
        let sampler = &samplers[id];
        let contribution = sampler.value_at(point, fuzziness);
        if contribution <= 0.0 {
            continue;
        }
        if let Ok(next) = sampler.material_at(point) {
            material = Some(match material {
                Some(current) if value > 0.0 => current.lerp(&next, contribution / (value + contribution)),
                _ => next,
            });
        }
        value += contribution;
    }
    // empty points take the first nearby material so edges don't bleed
    let material = material
        .or_else(|| additive.first().and_then(|&id| samplers[id].material_at(point).ok()))
        .unwrap_or_default();
    (carve(samplers, subtractive, point, fuzziness, value.min(1.0)), material)
}

/// Field value at `point`, skipping material blending
fn field_value(
    samplers: &[Arc<dyn VolumeSampler>],
    additive: &[usize],
    subtractive: &[usize],
    point: &Point3f,
    fuzziness: f32,
) -> f32 {
    let value: f32 = additive.iter().map(|&id| samplers[id].value_at(point, fuzziness)).sum();
    carve(samplers, subtractive, point, fuzziness, value.min(1.0))
}

/// Triangles of one node, marched before the shared consumer is locked
#[derive(Default)]
struct NodeTriangles(Vec<Triangle>);

impl TriangleConsumer for NodeTriangles {
    fn start(&mut self) {
        self.0.clear();
    }

    fn add_triangle(&mut self, triangle: &Triangle) {
        self.0.push(*triangle);
    }

    fn finish(&mut self) {}

    fn triangle_count(&self) -> usize {
        self.0.len()
    }
}

/// Pop and march nodes until the stack is empty
///
/// The consumer is locked once per node, only to copy the node's triangles
/// in, so jobs that share a consumer still march in parallel.
fn run_job<C: TriangleConsumer>(plan: &MarchPlan, shared: &Shared<C>, job_index: usize) -> usize {
    let consumer_index = job_index % shared.consumers.len();
    let mut scratch = NodeTriangles::default();
    let mut triangles = 0;

    while let Some(node) = plan.next_node() {
        scratch.start();
        let emitted = plan.march_node(&node, &mut scratch);

        let Some(mut slot) = shared.consumers.claim(consumer_index, plan.generation) else {
            debug!("march {}: job {} superseded", plan.generation, job_index);
            return triangles;
        };
        for triangle in &scratch.0 {
            slot.consumer.add_triangle(triangle);
        }
        drop(slot);

        trace!(
            "march {}: node {} (depth {}) gave {} triangles on job {}",
            plan.generation,
            node.info.id,
            node.info.depth,
            emitted,
            job_index
        );
        if let Some(observer) = &plan.observer {
            observer.did_march_node(&node.info, job_index, emitted);
        }
        triangles += emitted;
    }
    triangles
}

/// Indices of the additive and subtractive samplers
fn partition(samplers: &[Arc<dyn VolumeSampler>]) -> (Vec<usize>, Vec<usize>) {
    let mut additive = Vec::new();
    let mut subtractive = Vec::new();
    for (index, sampler) in samplers.iter().enumerate() {
        match sampler.mode() {
            Mode::Additive => additive.push(index),
            Mode::Subtractive => subtractive.push(index),
        }
    }
    (additive, subtractive)
}

/// A set of samplers over an octree, polygonized in parallel
///
/// Vertices are produced in lattice space `[0, size]^3` unless the marching
/// cubes configuration carries a transform.
pub struct OctreeVolume<C> {
    config: VolumeConfig,
    octree: Octree,
    samplers: Vec<Arc<dyn VolumeSampler>>,
    sampler_ids: Vec<u64>,
    next_sampler_id: u64,
    marching_cubes: MarchingCubes,
    pool: Arc<ThreadPool>,
    queue: Arc<MainThreadQueue>,
    shared: Arc<Shared<C>>,
}

impl<C> fmt::Debug for OctreeVolume<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OctreeVolume")
            .field("config", &self.config)
            .field("samplers", &self.samplers)
            .field("consumers", &self.shared.consumers.slots.len())
            .finish()
    }
}

impl<C> OctreeVolume<C>
where
    C: TriangleConsumer + Send + 'static,
{
    /// Create an empty volume
    ///
    /// Jobs write to `consumers[job_index % consumers.len()]`. Jobs sharing a
    /// consumer only contend while appending a finished node's triangles.
    pub fn new(
        config: VolumeConfig,
        pool: Arc<ThreadPool>,
        queue: Arc<MainThreadQueue>,
        consumers: Vec<C>,
    ) -> Result<Self> {
        config.validate()?;
        if consumers.is_empty() {
            return Err(Error::InvalidConfiguration(
                "volume needs at least one triangle consumer".to_string(),
            ));
        }
        if consumers.len() != pool.size() {
            debug!(
                "{} consumers for {} pool threads",
                consumers.len(),
                pool.size()
            );
        }

        let octree = Octree::new(config.size, config.min_node_size)?;
        debug!(
            "volume of size {} with {} octree nodes to depth {}",
            config.size,
            octree.node_count(),
            octree.depth()
        );

        Ok(Self {
            config,
            octree,
            samplers: Vec::new(),
            sampler_ids: Vec::new(),
            next_sampler_id: 0,
            marching_cubes: MarchingCubes::default(),
            pool,
            queue,
            shared: Arc::new(Shared {
                generation: AtomicU64::new(0),
                consumers: ConsumerSet::new(consumers),
            }),
        })
    }

    pub fn config(&self) -> &VolumeConfig {
        &self.config
    }

    pub fn size(&self) -> i32 {
        self.config.size
    }

    pub fn fuzziness(&self) -> f32 {
        self.config.fuzziness
    }

    /// Set the sampler shell width; negative values act as zero
    pub fn set_fuzziness(&mut self, fuzziness: f32) {
        self.config.fuzziness = fuzziness.max(0.0);
    }

    pub fn marching_cubes_config(&self) -> &MarchingCubesConfig {
        self.marching_cubes.config()
    }

    pub fn set_marching_cubes_config(&mut self, config: MarchingCubesConfig) {
        self.marching_cubes = MarchingCubes::new(config);
    }

    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    pub fn consumers(&self) -> &ConsumerSet<C> {
        &self.shared.consumers
    }

    pub fn pool(&self) -> &Arc<ThreadPool> {
        &self.pool
    }

    pub fn queue(&self) -> &Arc<MainThreadQueue> {
        &self.queue
    }

    /// Generation of the most recently started march
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    /// Take ownership of a sampler
    pub fn add<S: VolumeSampler + 'static>(&mut self, sampler: S) -> SamplerHandle<S> {
        let id = self.next_sampler_id;
        self.next_sampler_id += 1;
        self.samplers.push(Arc::new(sampler));
        self.sampler_ids.push(id);
        SamplerHandle::new(id)
    }

    fn index_of(&self, id: u64) -> Option<usize> {
        self.sampler_ids.iter().position(|&other| other == id)
    }

    pub fn get<S: VolumeSampler + 'static>(&self, handle: &SamplerHandle<S>) -> Option<&S> {
        let index = self.index_of(handle.id)?;
        self.samplers[index].as_any().downcast_ref::<S>()
    }

    /// Mutable access to a sampler
    ///
    /// Marches already running keep reading the state they started with; the
    /// sampler is cloned first if one of them still holds it.
    pub fn get_mut<S: VolumeSampler + 'static>(&mut self, handle: &SamplerHandle<S>) -> Option<&mut S> {
        let index = self.index_of(handle.id)?;
        let slot = &mut self.samplers[index];
        if Arc::get_mut(slot).is_none() {
            *slot = slot.clone_arc();
        }
        Arc::get_mut(slot)?.as_any_mut().downcast_mut::<S>()
    }

    /// Drop a sampler; returns whether it was present
    pub fn remove<S>(&mut self, handle: SamplerHandle<S>) -> bool {
        match self.index_of(handle.id) {
            Some(index) => {
                self.samplers.remove(index);
                self.sampler_ids.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.samplers.clear();
        self.sampler_ids.clear();
    }

    pub fn sampler_count(&self) -> usize {
        self.samplers.len()
    }

    pub fn additive_count(&self) -> usize {
        self.samplers.iter().filter(|s| s.mode() == Mode::Additive).count()
    }

    pub fn subtractive_count(&self) -> usize {
        self.samplers.iter().filter(|s| s.mode() == Mode::Subtractive).count()
    }

    /// Field value at `point` over every sampler
    pub fn value_at(&self, point: &Point3f) -> f32 {
        let (additive, subtractive) = partition(&self.samplers);
        field_value(&self.samplers, &additive, &subtractive, point, self.config.fuzziness)
    }

    /// Field value and blended material at `point` over every sampler
    pub fn sample_at(&self, point: &Point3f) -> (f32, MaterialState) {
        let (additive, subtractive) = partition(&self.samplers);
        sample_field(&self.samplers, &additive, &subtractive, point, self.config.fuzziness)
    }

    /// Run the mark and collect passes without polygonizing
    pub fn collect(&mut self) -> Vec<NodeInfo> {
        self.mark_and_collect()
            .iter()
            .map(|&id| NodeInfo::new(id, &self.octree.nodes()[id]))
            .collect()
    }

    fn mark_and_collect(&mut self) -> Vec<usize> {
        let (additive, subtractive) = partition(&self.samplers);
        self.octree.mark(&self.samplers, &additive, &subtractive);
        self.octree.collect()
    }

    fn prepare(&mut self, observer: Option<Arc<dyn MarchObserver>>) -> Arc<MarchPlan> {
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let ids = self.mark_and_collect();
        let nodes: Vec<NodeJob> = ids
            .into_iter()
            .map(|id| {
                let node = &self.octree.nodes()[id];
                NodeJob {
                    info: NodeInfo::new(id, node),
                    additive: node.additive.clone(),
                    subtractive: node.subtractive.clone(),
                }
            })
            .collect();

        debug!("march {}: collected {} nodes", generation, nodes.len());
        if let Some(observer) = &observer {
            let infos: Vec<NodeInfo> = nodes.iter().map(|n| n.info).collect();
            observer.did_collect(&infos);
        }

        Arc::new(MarchPlan {
            generation,
            samplers: self.samplers.clone(),
            fuzziness: self.config.fuzziness,
            marching_cubes: self.marching_cubes.clone(),
            observer,
            node_count: nodes.len(),
            pending: Mutex::new(nodes),
        })
    }

    fn dispatch(&self, plan: &Arc<MarchPlan>) -> Vec<JobHandle<usize>> {
        if plan.node_count == 0 {
            return Vec::new();
        }
        let jobs = self.pool.size();
        debug!("march {}: dispatching {} jobs", plan.generation, jobs);
        (0..jobs)
            .map(|job_index| {
                let plan = Arc::clone(plan);
                let shared = Arc::clone(&self.shared);
                self.pool.enqueue(move || run_job(&plan, &shared, job_index))
            })
            .collect()
    }

    /// Polygonize the volume, blocking until every consumer is sealed
    pub fn march(&mut self, observer: Option<Arc<dyn MarchObserver>>) -> Result<MarchStats> {
        let plan = self.prepare(observer);
        let handles = self.dispatch(&plan);
        let jobs = handles.len();

        let mut triangles = 0;
        for handle in handles {
            triangles += handle.wait()?;
        }

        let stats = MarchStats {
            generation: plan.generation,
            nodes_marched: plan.node_count,
            jobs,
            triangles,
        };
        if !self.shared.consumers.finalize(plan.generation) {
            return Err(Error::InvalidState(format!(
                "march {} was superseded while finishing",
                plan.generation
            )));
        }
        debug!(
            "march {}: {} triangles from {} nodes",
            stats.generation, stats.triangles, stats.nodes_marched
        );
        Ok(stats)
    }

    /// Polygonize the volume in the background
    ///
    /// Returns once the jobs are queued. When they finish, a closure is posted
    /// to the main-thread queue that seals the consumers and calls `on_ready`.
    /// If another march starts first, the result is dropped and `on_ready`
    /// never runs.
    pub fn march_async<F>(&mut self, on_ready: F, observer: Option<Arc<dyn MarchObserver>>) -> Result<()>
    where
        F: FnOnce(&ConsumerSet<C>, &MarchStats) + Send + 'static,
    {
        let plan = self.prepare(observer);
        let handles = self.dispatch(&plan);
        let mut stats = MarchStats {
            generation: plan.generation,
            nodes_marched: plan.node_count,
            jobs: handles.len(),
            triangles: 0,
        };
        drop(plan);

        let shared = Arc::clone(&self.shared);
        let queue = Arc::clone(&self.queue);
        let generation = stats.generation;

        // queued behind the march jobs, so it never waits on unstarted work
        self.pool.enqueue(move || {
            for handle in handles {
                match handle.wait() {
                    Ok(count) => stats.triangles += count,
                    Err(e) => {
                        error!("march {}: {}", generation, e);
                        return;
                    }
                }
            }
            if !shared.is_current(generation) {
                debug!("march {}: superseded, dropping result", generation);
                return;
            }
            queue.add(move || {
                if !shared.is_current(generation) || !shared.consumers.finalize(generation) {
                    debug!("march {}: superseded before delivery", generation);
                    return;
                }
                debug!(
                    "march {}: delivering {} triangles from {} nodes",
                    generation, stats.triangles, stats.nodes_marched
                );
                on_ready(&shared.consumers, &stats);
            });
        });
        Ok(())
    }
}
