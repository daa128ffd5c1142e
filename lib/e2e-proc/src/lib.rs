//! Procedural macros of the `e2e` harness.
use proc_macro::TokenStream;


/// Defines an end-to-end test that connects one client per parameter.
///
/// Every parameter is built with `<Type>::new().await?` before the body runs
/// and closed with `.close()` after it, whatever the body returned.
///
/// # Examples
///
/// ```rust,ignore
/// #[e2e::test]
/// async fn deploys_root(client: Client) -> eyre::Result<()> {
///     let owner = Keypair::generate();
///     let root = TokenRoot::new(&client, owner)?;
///     root.account().deploy(DeployOptions::with_giver()).await?;
///     assert!(root.account().state().await?.is_active());
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn test(attr: TokenStream, input: TokenStream) -> TokenStream {
    test::test(attr, input)
}
