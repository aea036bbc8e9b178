use proc_macro::TokenStream;
use syn::spanned::Spanned;

#[proc_macro]
pub fn struct_unpack_impl_for_num(item: TokenStream) -> TokenStream {
    let i = syn::parse_macro_input!(item as syn::Ident);
    let output = quote::quote! {
        impl crate::utils::struct_pack::StructUnpack for #i {
            fn unpack<R: std::io::Read + std::io::Seek>(mut reader: R, big: bool) -> std::io::Result<Self> {
                let mut buf = [0u8; std::mem::size_of::<#i>()];
                reader.read_exact(&mut buf)?;
                Ok(if big {
                    #i::from_be_bytes(buf)
                } else {
                    #i::from_le_bytes(buf)
                })
            }
        }

        impl crate::utils::struct_pack::StructPack for #i {
            fn pack<W: std::io::Write>(&self, writer: &mut W, big: bool) -> std::io::Result<()> {
                let bytes = if big {
                    self.to_be_bytes()
                } else {
                    self.to_le_bytes()
                };
                writer.write_all(&bytes)
            }
        }
    };
    output.into()
}

/// Derives `StructPack` for a struct with named fields.
///
/// The generated impl refers to `crate::utils::struct_pack`, so it can only be used
/// inside the `pex_anon` crate. Every field is packed in declaration order with the byte
/// order passed to `pack`.
#[proc_macro_derive(StructPack)]
pub fn struct_pack_derive(input: TokenStream) -> TokenStream {
    let sut = syn::parse_macro_input!(input as syn::ItemStruct);
    let name = sut.ident;
    let fields = match named_fields(&sut.fields) {
        Ok(fields) => fields,
        Err(err) => return err.to_compile_error().into(),
    };
    let output = quote::quote! {
        impl crate::utils::struct_pack::StructPack for #name {
            fn pack<W: std::io::Write>(&self, writer: &mut W, big: bool) -> std::io::Result<()> {
                #(crate::utils::struct_pack::StructPack::pack(&self.#fields, writer, big)?;)*
                Ok(())
            }
        }
    };
    output.into()
}

/// Derives `StructUnpack` for a struct with named fields, reading them in declaration order.
#[proc_macro_derive(StructUnpack)]
pub fn struct_unpack_derive(input: TokenStream) -> TokenStream {
    let sut = syn::parse_macro_input!(input as syn::ItemStruct);
    let name = sut.ident;
    let fields = match named_fields(&sut.fields) {
        Ok(fields) => fields,
        Err(err) => return err.to_compile_error().into(),
    };
    let types = sut.fields.iter().map(|field| &field.ty);
    let output = quote::quote! {
        impl crate::utils::struct_pack::StructUnpack for #name {
            fn unpack<R: std::io::Read + std::io::Seek>(mut reader: R, big: bool) -> std::io::Result<Self> {
                #(let #fields = <#types as crate::utils::struct_pack::StructUnpack>::unpack(&mut reader, big)?;)*
                Ok(Self { #(#fields),* })
            }
        }
    };
    output.into()
}

fn named_fields(fields: &syn::Fields) -> syn::Result<Vec<&syn::Ident>> {
    match fields {
        syn::Fields::Named(named) => Ok(named
            .named
            .iter()
            .filter_map(|field| field.ident.as_ref())
            .collect()),
        other => Err(syn::Error::new(
            other.span(),
            "only structs with named fields are supported",
        )),
    }
}
