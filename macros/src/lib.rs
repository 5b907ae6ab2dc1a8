//! Derive macros for folding a leaf record into one of the state machine's
//! closed sum types without hand-writing a `From` impl per variant.
use proc_macro::TokenStream;
use quote::quote;
use syn::{
	parse_macro_input,
	DeriveInput,
};

/// Derive `Into<Event>` for a struct whose name matches an `Event` variant.
#[proc_macro_derive(IntoEvent)]
pub fn into_event(input: TokenStream) -> TokenStream {
	let input = parse_macro_input!(input as DeriveInput);
	let name = input.ident;

	let expanded = quote! {
		impl From<#name> for Event {
			fn from(inner: #name) -> Event {
				Event::#name(inner)
			}
		}
	};

	TokenStream::from(expanded)
}

/// Derive `Into<StateChange>` for a struct whose name matches a
/// `StateChange` variant.
#[proc_macro_derive(IntoStateChange)]
pub fn into_state_change(input: TokenStream) -> TokenStream {
	let input = parse_macro_input!(input as DeriveInput);
	let name = input.ident;

	let expanded = quote! {
		impl From<#name> for StateChange {
			fn from(inner: #name) -> StateChange {
				StateChange::#name(inner)
			}
		}
	};

	TokenStream::from(expanded)
}
