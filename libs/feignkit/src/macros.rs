/// Declare a blocking client adapter.
///
/// Each method maps to one HTTP verb and path template and returns the raw
/// [`Response`](crate::Response):
///
/// ```
/// feignkit::feign_client! {
///     pub struct UsersClient {
///         fn get_user => GET "/users/{id}";
///         fn create_user => POST "/users";
///     }
/// }
/// ```
#[macro_export]
macro_rules! feign_client {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$mmeta:meta])*
                fn $method:ident => $verb:ident $path:literal;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            proxy: $crate::ClientProxy,
        }

        impl $name {
            $(
                $(#[$mmeta])*
                ///
                /// # Errors
                /// Same as `ClientProxy::execute`.
                #[allow(dead_code)]
                pub fn $method(
                    &self,
                    args: $crate::CallArgs,
                ) -> ::std::result::Result<$crate::Response, $crate::FeignError> {
                    self.proxy.execute(
                        &$crate::MethodMeta::new(
                            stringify!($method),
                            $crate::http::Method::$verb,
                            $path,
                        ),
                        args,
                    )
                }
            )*

            #[allow(dead_code)]
            #[must_use]
            pub fn proxy(&self) -> &$crate::ClientProxy {
                &self.proxy
            }
        }

        impl $crate::FeignTarget for $name {
            fn target() -> $crate::TargetType {
                $crate::TargetType::sync::<Self>(vec![
                    $(
                        $crate::MethodMeta::new(
                            stringify!($method),
                            $crate::http::Method::$verb,
                            $path,
                        ),
                    )*
                ])
            }

            fn from_proxy(proxy: $crate::ClientProxy) -> Self {
                Self { proxy }
            }
        }
    };
}

/// Declare a non-blocking client adapter; every method returns a
/// [`CallHandle`](crate::CallHandle).
#[macro_export]
macro_rules! async_feign_client {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$mmeta:meta])*
                fn $method:ident => $verb:ident $path:literal;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            proxy: $crate::AsyncClientProxy,
        }

        impl $name {
            $(
                $(#[$mmeta])*
                #[allow(dead_code)]
                #[must_use]
                pub fn $method(&self, args: $crate::CallArgs) -> $crate::CallHandle {
                    self.proxy.submit(
                        &$crate::MethodMeta::new(
                            stringify!($method),
                            $crate::http::Method::$verb,
                            $path,
                        ),
                        args,
                    )
                }
            )*

            #[allow(dead_code)]
            #[must_use]
            pub fn proxy(&self) -> &$crate::AsyncClientProxy {
                &self.proxy
            }
        }

        impl $crate::AsyncFeignTarget for $name {
            fn target() -> $crate::TargetType {
                $crate::TargetType::asynchronous::<Self>(vec![
                    $(
                        $crate::MethodMeta::new(
                            stringify!($method),
                            $crate::http::Method::$verb,
                            $path,
                        ),
                    )*
                ])
            }

            fn from_proxy(proxy: $crate::AsyncClientProxy) -> Self {
                Self { proxy }
            }
        }
    };
}
