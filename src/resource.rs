//! Wrapper instances shared by every handle category.
//!
//! An [`Instance`] holds one native pointer plus the driver tag it was
//! created with. It is either Live (pointer set) or Disposed (pointer null).
//! Disposal happens in one of three ways:
//!
//! - explicit [`Instance::dispose`]: deregister, null the pointer, release the
//!   native reference;
//! - dropping the last strong reference (the finalizer): same as explicit
//!   disposal;
//! - supersession by the registry ([`Tracked::forget`]): null the pointer and
//!   leave the native resource alone, since its ownership has moved to the
//!   wrapper that replaced this one.
//!
//! Textures and GPU render states belong to a renderer. Destroying the
//! renderer frees its textures natively, so releasing a renderer first
//! retires the managed identity of every texture it owns and disposes its
//! GPU render states.

use crate::error::BindError;
use crate::ffi::{NativeApi, SDL_GPURenderState, SDL_Palette, SDL_Renderer, SDL_Surface, SDL_Texture};
use crate::handle::{Driver, Kind, NativePtr};
use crate::hub::Shared;
use crate::registry::{Registry, Tracked};
use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::thread::{self, ThreadId};

/// Per-category glue between the generic instance and the native API.
pub trait Resource: Sized + Send + Sync + 'static {
    /// Native object type.
    type Raw;

    const KIND: Kind;

    /// The registry for this category inside a hub.
    fn registry(shared: &Shared) -> &Registry<Instance<Self>>;

    /// Take an additional native reference on behalf of a fabricated
    /// wrapper. Returns `false` for categories without a native reference
    /// count, in which case the fabricated wrapper does not own the object.
    ///
    /// # Safety
    ///
    /// `raw` must point to a live native object of this category.
    unsafe fn retain(raw: *mut Self::Raw) -> bool;

    /// Release one native reference.
    ///
    /// # Safety
    ///
    /// `raw` must point to a live native object of this category, and the
    /// caller must own the reference being released.
    unsafe fn destroy(api: &NativeApi, raw: *mut Self::Raw);

    /// Driver tag for an object surfacing through a lookup.
    ///
    /// # Safety
    ///
    /// `raw` must point to a live native object of this category.
    unsafe fn detect_driver(_api: &NativeApi, _raw: *mut Self::Raw) -> Driver {
        Driver::Generic
    }

    /// The renderer an object surfacing through a lookup belongs to, or
    /// null for categories not tied to a renderer.
    ///
    /// # Safety
    ///
    /// `raw` must point to a live native object of this category.
    unsafe fn owner(_api: &NativeApi, _raw: *mut Self::Raw) -> NativePtr {
        NativePtr::NULL
    }

    /// Called right before this hub destroys the native object.
    fn before_destroy(_shared: &Shared, _raw: *mut Self::Raw) {}
}

/// Bump the `refcount` field embedded in a native struct.
macro_rules! retain_embedded {
    ($raw:expr) => {{
        unsafe { (*$raw).refcount += 1 };
        true
    }};
}

pub mod markers {
    //! Category markers for [`Instance`](super::Instance).

    #[derive(Debug)]
    pub enum Renderer {}
    #[derive(Debug)]
    pub enum Texture {}
    #[derive(Debug)]
    pub enum Surface {}
    #[derive(Debug)]
    pub enum Palette {}
    #[derive(Debug)]
    pub enum GpuRenderState {}
}

/// Driver tag of a renderer, from its native name.
///
/// # Safety
///
/// `raw` must be null or point to a live native renderer.
pub(crate) unsafe fn renderer_driver(api: &NativeApi, raw: *mut SDL_Renderer) -> Driver {
    if raw.is_null() {
        return Driver::Unknown;
    }
    unsafe { crate::util::cstr_to_string((api.get_renderer_name)(raw)) }
        .map_or(Driver::Unknown, |name| Driver::from_renderer_name(&name))
}

impl Resource for markers::Renderer {
    type Raw = SDL_Renderer;
    const KIND: Kind = Kind::Renderer;

    fn registry(shared: &Shared) -> &Registry<Instance<Self>> {
        &shared.renderers
    }

    unsafe fn retain(_raw: *mut SDL_Renderer) -> bool {
        false
    }

    unsafe fn destroy(api: &NativeApi, raw: *mut SDL_Renderer) {
        unsafe { (api.destroy_renderer)(raw) }
    }

    unsafe fn detect_driver(api: &NativeApi, raw: *mut SDL_Renderer) -> Driver {
        unsafe { renderer_driver(api, raw) }
    }

    fn before_destroy(shared: &Shared, raw: *mut SDL_Renderer) {
        let owner = NativePtr::from_raw(raw);
        let textures = shared.textures.drain_matching(|t| t.owner == owner);
        let states = shared.gpu_render_states.drain_matching(|s| s.owner == owner);
        if !textures.is_empty() || !states.is_empty() {
            log::debug!(
                "renderer {owner}: retiring {} textures and {} GPU render states",
                textures.len(),
                states.len()
            );
        }

        for texture in &textures {
            texture.forget();
        }
        for state in &states {
            state.dispose();
        }
    }
}

impl Resource for markers::Texture {
    type Raw = SDL_Texture;
    const KIND: Kind = Kind::Texture;

    fn registry(shared: &Shared) -> &Registry<Instance<Self>> {
        &shared.textures
    }

    unsafe fn retain(raw: *mut SDL_Texture) -> bool {
        retain_embedded!(raw)
    }

    unsafe fn destroy(api: &NativeApi, raw: *mut SDL_Texture) {
        unsafe { (api.destroy_texture)(raw) }
    }

    unsafe fn detect_driver(api: &NativeApi, raw: *mut SDL_Texture) -> Driver {
        unsafe { renderer_driver(api, (api.get_renderer_from_texture)(raw)) }
    }

    unsafe fn owner(api: &NativeApi, raw: *mut SDL_Texture) -> NativePtr {
        NativePtr::from_raw(unsafe { (api.get_renderer_from_texture)(raw) })
    }
}

impl Resource for markers::Surface {
    type Raw = SDL_Surface;
    const KIND: Kind = Kind::Surface;

    fn registry(shared: &Shared) -> &Registry<Instance<Self>> {
        &shared.surfaces
    }

    unsafe fn retain(raw: *mut SDL_Surface) -> bool {
        retain_embedded!(raw)
    }

    unsafe fn destroy(api: &NativeApi, raw: *mut SDL_Surface) {
        unsafe { (api.destroy_surface)(raw) }
    }
}

impl Resource for markers::Palette {
    type Raw = SDL_Palette;
    const KIND: Kind = Kind::Palette;

    fn registry(shared: &Shared) -> &Registry<Instance<Self>> {
        &shared.palettes
    }

    unsafe fn retain(raw: *mut SDL_Palette) -> bool {
        retain_embedded!(raw)
    }

    unsafe fn destroy(api: &NativeApi, raw: *mut SDL_Palette) {
        unsafe { (api.destroy_palette)(raw) }
    }
}

impl Resource for markers::GpuRenderState {
    type Raw = SDL_GPURenderState;
    const KIND: Kind = Kind::GpuRenderState;

    fn registry(shared: &Shared) -> &Registry<Instance<Self>> {
        &shared.gpu_render_states
    }

    unsafe fn retain(_raw: *mut SDL_GPURenderState) -> bool {
        false
    }

    unsafe fn destroy(api: &NativeApi, raw: *mut SDL_GPURenderState) {
        unsafe { (api.destroy_gpu_render_state)(raw) }
    }
}

/// How an instance came to represent its native object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Registered right after a native creation call.
    Created,
    /// Fabricated on the lookup path while holding its own native reference.
    Borrowed,
    /// Fabricated on the lookup path for a category without a native
    /// reference count; never releases the native object.
    Unowned,
}

/// One managed identity for one native object.
pub struct Instance<R: Resource> {
    raw: AtomicPtr<R::Raw>,
    owner: NativePtr,
    driver: Driver,
    origin: Origin,
    thread: ThreadId,
    shared: Arc<Shared>,
    _marker: PhantomData<R>,
}

impl<R: Resource> Instance<R> {
    fn new(
        shared: Arc<Shared>,
        raw: *mut R::Raw,
        owner: NativePtr,
        driver: Driver,
        origin: Origin,
    ) -> Arc<Self> {
        Arc::new(Self {
            raw: AtomicPtr::new(raw),
            owner,
            driver,
            origin,
            thread: thread::current().id(),
            shared,
            _marker: PhantomData,
        })
    }

    /// Wrap and register an object just returned by a native creation call.
    ///
    /// A null `raw` means the creation call failed; the native error is
    /// returned and nothing is registered. `owner` is the renderer the object
    /// was created on, or null.
    pub(crate) fn created(
        shared: &Arc<Shared>,
        raw: *mut R::Raw,
        owner: NativePtr,
        driver: Driver,
        operation: &'static str,
    ) -> Result<Arc<Self>, BindError> {
        if raw.is_null() {
            return Err(BindError::native(&shared.api, operation));
        }
        let instance = Self::new(Arc::clone(shared), raw, owner, driver, Origin::Created);
        R::registry(shared).register(NativePtr::from_raw(raw), &instance);
        Ok(instance)
    }

    /// The live wrapper for an existing native object, fabricating one when
    /// none is alive. See [`Registry::try_get_or_create`].
    ///
    /// # Safety
    ///
    /// `raw` must be null or point to a live native object of this category.
    pub(crate) unsafe fn lookup(
        shared: &Arc<Shared>,
        raw: *mut R::Raw,
        driver: Option<Driver>,
    ) -> Option<Arc<Self>> {
        R::registry(shared).try_get_or_create(NativePtr::from_raw(raw), driver, || {
            let tag = match driver {
                Some(tag) => tag,
                None => unsafe { R::detect_driver(&shared.api, raw) },
            };
            let origin = if unsafe { R::retain(raw) } {
                Origin::Borrowed
            } else {
                Origin::Unowned
            };
            let owner = unsafe { R::owner(&shared.api, raw) };
            Some(Self::new(Arc::clone(shared), raw, owner, tag, origin))
        })
    }

    /// The native pointer, or `Disposed` once the instance has been disposed.
    pub fn raw(&self) -> Result<*mut R::Raw, BindError> {
        let raw = self.raw.load(Ordering::Acquire);
        if raw.is_null() {
            Err(BindError::Disposed { kind: R::KIND })
        } else {
            Ok(raw)
        }
    }

    /// The native pointer, null once disposed.
    pub fn raw_or_null(&self) -> *mut R::Raw {
        self.raw.load(Ordering::Acquire)
    }

    pub fn is_disposed(&self) -> bool {
        self.raw_or_null().is_null()
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    /// The renderer this object belongs to, or null.
    pub fn owner(&self) -> NativePtr {
        self.owner
    }

    /// Dispose the instance. Idempotent.
    ///
    /// Deregisters before the pointer is nulled, then releases the native
    /// reference this instance owns. Other handles to the same instance
    /// observe it as disposed afterwards.
    pub fn dispose(&self) {
        let raw = self.raw.load(Ordering::Acquire);
        if raw.is_null() {
            return;
        }
        self.check_thread("disposed");

        R::registry(&self.shared).deregister(NativePtr::from_raw(raw), self);
        if self
            .raw
            .compare_exchange(raw, ptr::null_mut(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.release(raw);
        }
    }

    fn release(&self, raw: *mut R::Raw) {
        if self.origin == Origin::Unowned {
            return;
        }
        R::before_destroy(&self.shared, raw);
        unsafe { R::destroy(&self.shared.api, raw) };
    }

    /// Warn about use off the creating thread when the hub asks for it.
    /// Returns whether a warning was logged.
    fn check_thread(&self, action: &str) -> bool {
        if !self.shared.options.warn_cross_thread || thread::current().id() == self.thread {
            return false;
        }
        log::warn!(
            "{} {} {action} on {:?}, created on {:?}",
            R::KIND,
            NativePtr::from_raw(self.raw_or_null()),
            thread::current().id(),
            self.thread
        );
        true
    }
}

impl<R: Resource> Tracked for Instance<R> {
    fn driver(&self) -> Driver {
        self.driver
    }

    fn is_live(&self) -> bool {
        !self.is_disposed()
    }

    fn forget(&self) {
        let raw = self.raw.swap(ptr::null_mut(), Ordering::AcqRel);
        if !raw.is_null() {
            log::debug!(
                "{} {}: managed identity retired",
                R::KIND,
                NativePtr::from_raw(raw)
            );
        }
    }
}

impl<R: Resource> Drop for Instance<R> {
    fn drop(&mut self) {
        let raw = *self.raw.get_mut();
        if raw.is_null() {
            return;
        }
        self.check_thread("finalized");

        R::registry(&self.shared).deregister(NativePtr::from_raw(raw), self);
        *self.raw.get_mut() = ptr::null_mut();
        self.release(raw);
    }
}

impl<R: Resource> fmt::Debug for Instance<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("kind", &R::KIND)
            .field("raw", &NativePtr::from_raw(self.raw_or_null()))
            .field("owner", &self.owner)
            .field("driver", &self.driver)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Methods every public wrapper type shares. The wrapper must be a struct
/// with a single `inner: Arc<Instance<$marker>>` field.
macro_rules! impl_wrapper {
    ($wrapper:ident, $marker:ty) => {
        impl $wrapper {
            fn from_instance(inner: std::sync::Arc<$crate::resource::Instance<$marker>>) -> Self {
                Self { inner }
            }

            pub(crate) fn created(
                shared: &std::sync::Arc<$crate::hub::Shared>,
                raw: *mut <$marker as $crate::resource::Resource>::Raw,
                owner: $crate::handle::NativePtr,
                driver: $crate::handle::Driver,
                operation: &'static str,
            ) -> Result<Self, $crate::error::BindError> {
                $crate::resource::Instance::<$marker>::created(shared, raw, owner, driver, operation)
                    .map(Self::from_instance)
            }

            /// # Safety
            ///
            /// `raw` must be null or point to a live native object.
            pub(crate) unsafe fn lookup(
                shared: &std::sync::Arc<$crate::hub::Shared>,
                raw: *mut <$marker as $crate::resource::Resource>::Raw,
                driver: Option<$crate::handle::Driver>,
            ) -> Option<Self> {
                unsafe { $crate::resource::Instance::<$marker>::lookup(shared, raw, driver) }
                    .map(Self::from_instance)
            }

            /// The wrapper for a native object obtained outside this hub's
            /// creation calls.
            ///
            /// Returns the live wrapper already registered for `raw` if there
            /// is one. Otherwise a new wrapper is fabricated, taking its own
            /// native reference where the object is reference counted.
            /// Returns `None` for a null pointer.
            ///
            /// # Safety
            ///
            /// `raw` must be null or point to a live native object.
            pub unsafe fn try_from_native(
                bindings: &$crate::hub::Bindings,
                raw: *mut <$marker as $crate::resource::Resource>::Raw,
            ) -> Option<Self> {
                unsafe { Self::lookup(bindings.shared(), raw, None) }
            }

            /// Like [`Self::try_from_native`], but only accepts a live wrapper
            /// tagged with `driver`. A live wrapper with a different tag is a
            /// misuse of driver-specific accessors and yields `None` without
            /// touching the registry. A fabricated wrapper is tagged `driver`.
            ///
            /// # Safety
            ///
            /// `raw` must be null or point to a live native object.
            pub unsafe fn try_from_native_as(
                bindings: &$crate::hub::Bindings,
                raw: *mut <$marker as $crate::resource::Resource>::Raw,
                driver: $crate::handle::Driver,
            ) -> Option<Self> {
                unsafe { Self::lookup(bindings.shared(), raw, Some(driver)) }
            }

            /// The native pointer, or [`BindError::Disposed`](crate::BindError::Disposed).
            pub fn raw(
                &self,
            ) -> Result<*mut <$marker as $crate::resource::Resource>::Raw, $crate::error::BindError>
            {
                self.inner.raw()
            }

            pub fn is_disposed(&self) -> bool {
                self.inner.is_disposed()
            }

            /// Dispose this object. Every clone observes the disposal.
            /// Disposing twice is a no-op.
            pub fn dispose(&self) {
                self.inner.dispose();
            }

            pub fn driver(&self) -> $crate::handle::Driver {
                $crate::registry::Tracked::driver(&*self.inner)
            }

            pub fn origin(&self) -> $crate::resource::Origin {
                self.inner.origin()
            }
        }

        impl PartialEq for $wrapper {
            fn eq(&self, other: &Self) -> bool {
                std::sync::Arc::ptr_eq(&self.inner, &other.inner)
            }
        }

        impl Eq for $wrapper {}

        impl std::fmt::Debug for $wrapper {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($wrapper))
                    .field(&*self.inner)
                    .finish()
            }
        }
    };
}

pub(crate) use impl_wrapper;
