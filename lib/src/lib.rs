//! Stitch calls to patch routines into the method bodies of a compiled module
//!
//! A patch module holds routines on types named after their targets (`PlayerPatch.Update`
//! patches `Player.Update`). Each routine carries a small descriptor: where in the target the
//! call goes, which arguments it gets, and what happens after it returns. Stitching turns that
//! descriptor into instructions and inserts them into the target method.
//!
//! ### Simple example
//!
//! ```
//! use stitchil::model::*;
//! use stitchil::patch::{PatchDescriptor, PatchRoutine, PostCallAction};
//! use stitchil::stitch::{Settings, Stitcher};
//!
//! # fn stitch() -> Result<(), stitchil::stitch::Error> {
//! let mut module = Module::new("Game").with_type(
//!     Type::new("Game", "Player").with_method(
//!         Method::new("Update", MethodFlags::PUBLIC)
//!             .with_body(vec![Instruction::simple(Opcode::Ret)]),
//!     ),
//! );
//!
//! // Call `PlayerPatch.Update(this)` first thing, then return
//! let routine = PatchRoutine::new(
//!     "PlayerPatch",
//!     MethodRef {
//!         scope: String::from("Patches"),
//!         declaring_type: String::from("Patches.PlayerPatch"),
//!         name: String::from("Update"),
//!         parameter_count: 1,
//!         has_return: false,
//!     },
//!     PatchDescriptor {
//!         arguments: stitchil::patch::ArgPassing::Selected {
//!             instance: true,
//!             selection: stitchil::patch::ArgSelection::None,
//!         },
//!         post_call: PostCallAction::Return,
//!         ..PatchDescriptor::default()
//!     },
//! );
//!
//! let settings = Settings::new();
//! let report = Stitcher::new(&mut module, &settings).stitch_all(&[routine])?;
//! assert_eq!(report.applied, vec![String::from("Game.Player::Update")]);
//!
//! let body = module.types[0].methods[0].body.as_ref().unwrap();
//! let listing: Vec<String> = body.instructions().map(|i| i.to_string()).collect();
//! assert_eq!(
//!     listing,
//!     vec!["ldarg 0", "call [Patches]Patches.PlayerPatch::Update/1", "ret", "ret"]
//! );
//! # Ok(())
//! # }
//! # stitch().unwrap();
//! ```

pub mod image;
pub mod model;
pub mod patch;
pub mod stitch;

pub use stitch::Settings;
