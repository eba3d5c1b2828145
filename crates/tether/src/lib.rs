//! # Tether
//!
//! Connects an AudioUnit's parameters and custom properties to the scripts
//! of a web view based editor.
//!
//! ## Architecture
//!
//! ```text
//! host notification threads
//!        ↓  (channel)
//! EventListener   coalesces bursts, flushes on the RunLoop
//!        ↓
//! ScriptBridge    OnParameterChange / OnPropertyChange / gesture handlers
//!        ↓
//! page script     Params.Gain.Set(0.5), Properties.ScopeData.Get(), ...
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tether::prelude::*;
//!
//! let clock: Arc<dyn Clock> = Arc::new(HostClock::new());
//! let run_loop = RunLoop::new(clock.clone());
//! let bridge = ScriptBridge::new(unit.clone(), unit, run_loop.clone(), clock, BridgeConfig::new())?;
//!
//! bridge.on_context_created(context)?;
//! run_loop.run();
//! bridge.on_context_released();
//! ```

// Re-export sub-crates
pub use tether_core as core;
pub use tether_listener as listener;
pub use tether_script as script;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use tether::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    pub use tether_core::{
        // Host side
        AudioUnitHost, EventSource, SimulatedUnit,
        // Events
        AuEvent, ComponentId, EventKind, ParameterId, PropertyId, Scope,
        // Metadata
        ParameterInfo, ParameterUnit, PropertyDescriptor, PropertyValueType,
        // Configuration
        BridgeConfig, ListenerConfig,
        // Errors
        ConfigError, HostError,
    };

    pub use tether_listener::{Clock, Delivery, EventListener, HostClock, ListenerError, LoopHandle, RunLoop};

    pub use tether_script::{
        BridgeError, ContextPhase, FunctionRef, ObjectRef, ScriptBridge, ScriptContext,
        ScriptException, ScriptValue,
    };
}
